use super::{ArgSchema, OperationalState, Plugin, PluginContext, PluginDescriptor, PluginError};
use crate::core::command::Command;
use crate::core::config::AliasError;
use crate::core::rank::RankLevel;

#[derive(Debug, Default)]
pub struct AliasCommand;

impl Plugin for AliasCommand {
    fn descriptor() -> PluginDescriptor {
        PluginDescriptor::builtin("alias", RankLevel::BasicUser).help(
            "List or define aliases.\nALIAS name=expansion defines one, ALIAS name shows one.",
        )
    }

    fn execute(
        &mut self,
        ctx: &mut PluginContext<'_>,
        cmd: &Command,
    ) -> Result<OperationalState, PluginError> {
        let payload = cmd.payload();
        if payload.is_empty() {
            let listing: Vec<String> = ctx
                .shell()
                .aliases()
                .get_all()
                .iter()
                .map(|(alias, expansion)| format!("{}='{}'", alias, expansion))
                .collect();
            for line in listing {
                ctx.print(&line)?;
            }
            return Ok(OperationalState::Complete);
        }

        match payload.split_once('=') {
            Some((name, expansion)) => {
                ctx.shell().aliases_mut().define(name.trim(), expansion)?;
            }
            None => {
                let expansion = ctx
                    .shell()
                    .aliases()
                    .get(payload)
                    .map(str::to_string)
                    .ok_or_else(|| AliasError::NotFound(payload.to_string()))?;
                ctx.print(&format!("{}='{}'", payload.to_lowercase(), expansion))?;
            }
        }
        Ok(OperationalState::Complete)
    }
}

#[derive(Debug, Default)]
pub struct UnaliasCommand;

impl Plugin for UnaliasCommand {
    fn descriptor() -> PluginDescriptor {
        PluginDescriptor::builtin("unalias", RankLevel::BasicUser)
            .schema(ArgSchema::positionals(1, Some(1)))
            .help("Remove an alias.")
    }

    fn execute(
        &mut self,
        ctx: &mut PluginContext<'_>,
        _cmd: &Command,
    ) -> Result<OperationalState, PluginError> {
        let name = ctx
            .args
            .positional(0)
            .ok_or_else(|| PluginError::InvalidArguments("UNALIAS <name>".into()))?;
        ctx.shell().aliases_mut().remove(name)?;
        Ok(OperationalState::Complete)
    }
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

    fn run<P: Plugin>(plugin: &mut P, state: &ShellState, text: &str) -> Result<OperationalState, PluginError> {
        let cmd = Command::new(text, Actor::new("ada", RankLevel::BasicUser));
        run_plugin(plugin, state, &PluginRegistry::new(), &cmd, &CancelToken::new())
    }

    #[test]
    fn test_define_list_and_remove() {
        let console = MemoryConsole::new();
        let state = ShellState::new(&ShellConfig::new(), Box::new(console.clone()));

        run(&mut AliasCommand, &state, "ALIAS ll=\"LIST /all\"").unwrap();
        assert_eq!(state.aliases().get("LL"), Some("LIST /all"));

        run(&mut AliasCommand, &state, "ALIAS").unwrap();
        assert!(console.contains("ll='LIST /all'"));

        run(&mut UnaliasCommand, &state, "UNALIAS ll").unwrap();
        assert!(state.aliases().is_empty());
    }

    #[test]
    fn test_self_reference_rejected() {
        let state = ShellState::new(&ShellConfig::new(), Box::new(MemoryConsole::new()));
        let result = run(&mut AliasCommand, &state, "ALIAS loop=loop again");
        assert_eq!(
            result,
            Err(PluginError::Alias(AliasError::SelfReference("loop".into())))
        );
    }

    #[test]
    fn test_unknown_alias() {
        let state = ShellState::new(&ShellConfig::new(), Box::new(MemoryConsole::new()));
        assert!(matches!(
            run(&mut AliasCommand, &state, "ALIAS nope"),
            Err(PluginError::Alias(AliasError::NotFound(_)))
        ));
        assert!(matches!(
            run(&mut UnaliasCommand, &state, "UNALIAS nope"),
            Err(PluginError::Alias(AliasError::NotFound(_)))
        ));
    }
}
