use super::{ArgSchema, OperationalState, Plugin, PluginContext, PluginDescriptor, PluginError};
use crate::core::command::Command;
use crate::core::rank::RankLevel;
use crate::terminal::Tone;

/// Shows the cached command history, or purges it with `/clear`.
#[derive(Debug, Default)]
pub struct HistoryCommand;

impl Plugin for HistoryCommand {
    fn descriptor() -> PluginDescriptor {
        PluginDescriptor::builtin("history", RankLevel::Unverified)
            .schema(ArgSchema::none().with_switches(&["clear"]))
            .help("Show previous commands.\nHISTORY /clear forgets every processed command.")
    }

    fn execute(
        &mut self,
        ctx: &mut PluginContext<'_>,
        _cmd: &Command,
    ) -> Result<OperationalState, PluginError> {
        if ctx.args.has_switch("clear") {
            let removed = ctx.shell().queue().purge();
            ctx.print_tone(Tone::Hint, &format!("{} command(s) forgotten", removed))?;
            return Ok(OperationalState::Complete);
        }

        let entries: Vec<String> = ctx
            .shell()
            .queue()
            .iter()
            .filter(|cmd| cmd.is_processed())
            .enumerate()
            .map(|(i, cmd)| {
                format!(
                    "{:>4}  {}  {}",
                    i + 1,
                    cmd.created().format("%H:%M:%S"),
                    cmd.text()
                )
            })
            .collect();

        for entry in entries {
            ctx.checkpoint()?;
            ctx.print(&entry)?;
        }
        Ok(OperationalState::Complete)
    }
}
