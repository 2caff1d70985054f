use std::fs;

use tracing::debug;

use super::{ArgSchema, OperationalState, Plugin, PluginContext, PluginDescriptor, PluginError};
use crate::core::command::Command;
use crate::core::rank::RankLevel;
use crate::terminal::Tone;

/// Queues every command in a script file, in file order.
#[derive(Debug, Default)]
pub struct SourceCommand;

impl Plugin for SourceCommand {
    fn descriptor() -> PluginDescriptor {
        PluginDescriptor::builtin("source", RankLevel::BasicUser)
            .schema(ArgSchema::positionals(1, Some(1)))
            .help("Run the commands in a file.\nBlank lines and lines starting with # are skipped.")
    }

    fn execute(
        &mut self,
        ctx: &mut PluginContext<'_>,
        cmd: &Command,
    ) -> Result<OperationalState, PluginError> {
        let args = ctx.args;
        let path = args
            .positional(0)
            .ok_or_else(|| PluginError::InvalidArguments("SOURCE <file>".into()))?;
        let script = fs::read_to_string(path)
            .map_err(|e| PluginError::Failed(format!("{}: {}", path, e)))?;

        let lines: Vec<&str> = script
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        let room = ctx.shell().queue().room();
        if lines.len() > room {
            return Err(PluginError::Failed(format!(
                "{}: {} command(s) but only {} fit in the queue; raise cache_limit",
                path,
                lines.len(),
                room
            )));
        }

        let mut queued = 0;
        for line in lines {
            ctx.checkpoint()?;
            let keep = cmd.allow_cache() && ctx.registry.keeps_history(line, &ctx.shell().aliases());
            ctx.shell()
                .enqueue(Command::new(line, cmd.actor().clone()).with_cache(keep))?;
            queued += 1;
        }

        debug!(path, queued, "script sourced");
        ctx.print_tone(Tone::Hint, &format!("{} command(s) queued from {}", queued, path))?;
        Ok(OperationalState::Complete)
    }
}
