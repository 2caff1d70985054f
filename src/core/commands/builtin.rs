use super::PluginError;
use crate::core::command::Command;
use crate::shell::state::ShellState;
use crate::terminal::{Console, Tone};

/// Reserved verb that stops the dispatch loop.
pub const EXIT_TOKEN: &str = "BYE";

/// Short-form commands. They are resolved before aliases and carry no
/// rank requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmdlet {
    Cls,
    Ver,
    Set,
    Who,
    Bye,
}

impl Cmdlet {
    pub const ALL: [Cmdlet; 5] = [Cmdlet::Cls, Cmdlet::Ver, Cmdlet::Set, Cmdlet::Who, Cmdlet::Bye];

    pub fn from_verb(verb: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|cmdlet| cmdlet.name().eq_ignore_ascii_case(verb))
    }

    pub fn name(self) -> &'static str {
        match self {
            Cmdlet::Cls => "CLS",
            Cmdlet::Ver => "VER",
            Cmdlet::Set => "SET",
            Cmdlet::Who => "WHO",
            Cmdlet::Bye => EXIT_TOKEN,
        }
    }

    pub fn run(
        self,
        cmd: &Command,
        console: &mut dyn Console,
        state: &ShellState,
    ) -> Result<(), PluginError> {
        match self {
            Cmdlet::Cls => console.clear_screen()?,
            Cmdlet::Ver => console.write_line(
                Tone::Normal,
                &format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            )?,
            Cmdlet::Who => {
                let actor = cmd.actor();
                console.write_line(Tone::Normal, &format!("{} ({})", actor.name(), actor.rank()))?;
            }
            Cmdlet::Set => set_variable(cmd, console, state)?,
            Cmdlet::Bye => state.stop(),
        }
        Ok(())
    }
}

fn set_variable(
    cmd: &Command,
    console: &mut dyn Console,
    state: &ShellState,
) -> Result<(), PluginError> {
    let payload = cmd.payload();
    if payload.is_empty() {
        let lines: Vec<String> = state
            .environment()
            .iter()
            .map(|var| {
                let marker = if var.read_only { " (read-only)" } else { "" };
                format!("{}={}{}", var.name, var.value, marker)
            })
            .collect();
        for line in lines {
            console.write_line(Tone::Normal, &line)?;
        }
        return Ok(());
    }

    let caller = cmd.actor();
    match payload.split_once('=') {
        Some((name, "")) => state.environment_mut().remove(name.trim(), caller)?,
        Some((name, value)) => state
            .environment_mut()
            .set(name.trim(), value.trim(), caller)?,
        None => {
            let value = state.environment().get(payload).map(str::to_string);
            match value {
                Some(value) => console.write_line(Tone::Normal, &format!("{}={}", payload, value))?,
                None => {
                    return Err(PluginError::Failed(format!(
                        "environment variable {} not defined",
                        payload
                    )))
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::actor::Actor;
    use crate::core::config::ShellConfig;
    use crate::core::env::{EnvError, ERROR_LEVEL};
    use crate::core::rank::RankLevel;
    use crate::terminal::MemoryConsole;

    fn setup() -> (ShellState, MemoryConsole) {
        let console = MemoryConsole::new();
        let state = ShellState::new(&ShellConfig::new(), Box::new(console.clone()));
        (state, console)
    }

    #[test]
    fn test_from_verb() {
        assert_eq!(Cmdlet::from_verb("bye"), Some(Cmdlet::Bye));
        assert_eq!(Cmdlet::from_verb("Set"), Some(Cmdlet::Set));
        assert_eq!(Cmdlet::from_verb("ls"), None);
        assert_eq!(Cmdlet::from_verb("HELP"), None);
    }

    #[test]
    fn test_set_define_show_and_remove() {
        let (state, mut console) = setup();
        let actor = Actor::new("alice", RankLevel::BasicUser);

        let define = Command::new("SET COLOR=blue", actor.clone());
        Cmdlet::Set.run(&define, &mut console, &state).unwrap();
        assert_eq!(state.environment().get("color"), Some("blue"));

        let show = Command::new("SET COLOR", actor.clone());
        Cmdlet::Set.run(&show, &mut console, &state).unwrap();
        assert!(console.contains("COLOR=blue"));

        let remove = Command::new("SET COLOR=", actor);
        Cmdlet::Set.run(&remove, &mut console, &state).unwrap();
        assert_eq!(state.environment().get("COLOR"), None);
    }

    #[test]
    fn test_set_cannot_touch_error_level() {
        let (state, mut console) = setup();
        let cmd = Command::new("SET ERRORLEVEL=0", Actor::new("alice", RankLevel::SuperUser));
        let err = Cmdlet::Set.run(&cmd, &mut console, &state).unwrap_err();
        assert!(matches!(err, PluginError::Env(EnvError::ReadOnly { .. })));
        assert!(state.environment().variable(ERROR_LEVEL).is_some());
    }

    #[test]
    fn test_who_and_ver() {
        let (state, mut console) = setup();
        let cmd = Command::new("WHO", state.actor());
        Cmdlet::Who.run(&cmd, &mut console, &state).unwrap();
        assert!(console.contains("(BasicUser)"));

        Cmdlet::Ver.run(&cmd, &mut console, &state).unwrap();
        assert!(console.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_who_reports_command_actor() {
        let (state, mut console) = setup();
        let cmd = Command::new("WHO", Actor::new("carol", RankLevel::PowerUser));
        Cmdlet::Who.run(&cmd, &mut console, &state).unwrap();
        assert!(console.contains("carol (PowerUser)"));
    }

    #[test]
    fn test_user_named_system_cannot_set_error_level() {
        let (state, mut console) = setup();
        state.set_error_level("2");
        let cmd = Command::new("SET ERRORLEVEL=", Actor::new("system", RankLevel::SuperUser));
        let err = Cmdlet::Set.run(&cmd, &mut console, &state).unwrap_err();
        assert!(matches!(err, PluginError::Env(EnvError::ReadOnly { .. })));
        assert_eq!(state.error_level(), "2");
    }

    #[test]
    fn test_bye_stops_shell() {
        let (state, mut console) = setup();
        let cmd = Command::new(EXIT_TOKEN, state.actor());
        Cmdlet::Bye.run(&cmd, &mut console, &state).unwrap();
        assert!(!state.is_alive());
    }
}
