use super::{ArgSchema, OperationalState, Plugin, PluginContext, PluginDescriptor, PluginError};
use crate::core::command::Command;
use crate::core::rank::RankLevel;
use crate::core::store::{Hive, StoreError};

/// `CONFIG get <hive.path>` / `CONFIG set <hive.path> <value>` against the
/// configuration store.
#[derive(Debug, Default)]
pub struct SettingsCommand;

impl Plugin for SettingsCommand {
    fn descriptor() -> PluginDescriptor {
        PluginDescriptor::builtin("config", RankLevel::PowerUser)
            .schema(ArgSchema::positionals(2, Some(3)))
            .help("Read or write the configuration store.\nCONFIG get user.theme\nCONFIG set user.theme dark")
    }

    fn execute(
        &mut self,
        ctx: &mut PluginContext<'_>,
        _cmd: &Command,
    ) -> Result<OperationalState, PluginError> {
        let args = ctx.args;
        let action = args.positional(0).unwrap_or_default();
        let key = args.positional(1).unwrap_or_default();
        let (hive, path) = split_key(key)?;
        let store = ctx.store();

        match (action.to_ascii_lowercase().as_str(), args.positional(2)) {
            ("get", None) => match store.get(hive, path) {
                Some(value) => ctx.print(&format!("{}.{} = {}", hive, path, value))?,
                None => return Err(PluginError::Failed(format!("{} is not set", key))),
            },
            ("set", Some(value)) => store.set(hive, path, value)?,
            _ => {
                return Err(PluginError::InvalidArguments(
                    "CONFIG get <hive.path> | CONFIG set <hive.path> <value>".into(),
                ))
            }
        }
        Ok(OperationalState::Complete)
    }
}

fn split_key(key: &str) -> Result<(Hive, &str), PluginError> {
    let (hive, path) = key
        .split_once('.')
        .ok_or_else(|| StoreError::InvalidPath(key.to_string()))?;
    Ok((hive.parse()?, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::actor::Actor;
    use crate::core::cancel::CancelToken;
    use crate::core::commands::testing::run_plugin;
    use crate::core::commands::PluginRegistry;
    use crate::core::config::ShellConfig;
    use crate::shell::state::ShellState;
    use crate::terminal::MemoryConsole;

    fn run(state: &ShellState, text: &str) -> Result<OperationalState, PluginError> {
        let cmd = Command::new(text, Actor::new("ada", RankLevel::PowerUser));
        run_plugin(&mut SettingsCommand, state, &PluginRegistry::new(), &cmd, &CancelToken::new())
    }

    #[test]
    fn test_set_then_get() {
        let console = MemoryConsole::new();
        let state = ShellState::new(&ShellConfig::new(), Box::new(console.clone()));

        run(&state, "CONFIG set user.editor.theme dark").unwrap();
        run(&state, "CONFIG get USER.editor.theme").unwrap();
        assert!(console.contains("user.editor.theme = dark"));
    }

    #[test]
    fn test_system_hive_is_read_only() {
        let state = ShellState::new(&ShellConfig::new(), Box::new(MemoryConsole::new()));
        assert_eq!(
            run(&state, "CONFIG set system.boot fast"),
            Err(PluginError::Store(StoreError::ReadOnlyHive(Hive::System)))
        );
    }

    #[test]
    fn test_bad_keys() {
        let state = ShellState::new(&ShellConfig::new(), Box::new(MemoryConsole::new()));
        assert!(matches!(
            run(&state, "CONFIG get nohive"),
            Err(PluginError::Store(StoreError::InvalidPath(_)))
        ));
        assert!(matches!(
            run(&state, "CONFIG get vault.key"),
            Err(PluginError::Store(StoreError::UnknownHive(_)))
        ));
        assert!(matches!(
            run(&state, "CONFIG get user.missing"),
            Err(PluginError::Failed(_))
        ));
    }
}
