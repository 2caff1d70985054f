use super::{ArgSchema, OperationalState, Plugin, PluginContext, PluginDescriptor, PluginError};
use crate::core::command::Command;
use crate::core::rank::RankLevel;
use crate::terminal::Tone;

/// Lists the commands the actor may run, or details one of them.
#[derive(Debug, Default)]
pub struct HelpCommand;

impl Plugin for HelpCommand {
    fn descriptor() -> PluginDescriptor {
        PluginDescriptor::builtin("help", RankLevel::None)
            .schema(ArgSchema::positionals(0, Some(1)))
            .help("List available commands.\nHELP <command> shows the usage of one command.")
    }

    fn execute(
        &mut self,
        ctx: &mut PluginContext<'_>,
        _cmd: &Command,
    ) -> Result<OperationalState, PluginError> {
        let rank = ctx.actor.rank();

        let args = ctx.args;
        if let Some(name) = args.positional(0) {
            let descriptor = ctx
                .registry
                .lookup(name)
                .filter(|d| rank.satisfies(d.required_rank))
                .cloned()
                .ok_or_else(|| PluginError::Failed(format!("no help for {}", name)))?;

            ctx.print_tone(
                Tone::Echo,
                &format!("{} {}", descriptor.name, descriptor.version),
            )?;
            for line in descriptor.help.lines() {
                ctx.print(line)?;
            }
            ctx.print_tone(
                Tone::Hint,
                &format!(
                    "usage: {}; requires {}",
                    descriptor.schema.usage(),
                    descriptor.required_rank
                ),
            )?;
            return Ok(OperationalState::Complete);
        }

        let visible = ctx.registry.visible_to(rank);
        let width = visible
            .iter()
            .map(|d| d.name.as_str().len())
            .max()
            .unwrap_or(0);
        for descriptor in visible {
            ctx.print(&format!(
                "{:<width$}  {}",
                descriptor.name.as_str(),
                descriptor.summary(),
                width = width
            ))?;
        }
        Ok(OperationalState::Complete)
    }
}
