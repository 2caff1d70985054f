use std::thread;
use std::time::{Duration, Instant};

use super::{ArgSchema, OperationalState, Plugin, PluginContext, PluginDescriptor, PluginError};
use crate::core::command::Command;
use crate::core::rank::RankLevel;

const TICK: Duration = Duration::from_millis(10);

/// Longest pause accepted, one day.
const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Sleeps for the given number of milliseconds; Ctrl+C cuts it short.
#[derive(Debug, Default)]
pub struct WaitCommand;

impl Plugin for WaitCommand {
    fn descriptor() -> PluginDescriptor {
        PluginDescriptor::builtin("wait", RankLevel::Unverified)
            .schema(ArgSchema::positionals(1, Some(1)))
            .help("Pause for N milliseconds.")
    }

    fn execute(
        &mut self,
        ctx: &mut PluginContext<'_>,
        _cmd: &Command,
    ) -> Result<OperationalState, PluginError> {
        let millis: u64 = ctx
            .args
            .positional(0)
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| PluginError::InvalidArguments("WAIT <milliseconds>".into()))?;

        let deadline = Some(Duration::from_millis(millis))
            .filter(|wait| *wait <= MAX_WAIT)
            .and_then(|wait| Instant::now().checked_add(wait))
            .ok_or_else(|| {
                PluginError::InvalidArguments(format!("WAIT accepts at most {} ms", MAX_WAIT.as_millis()))
            })?;
        loop {
            ctx.checkpoint()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(OperationalState::Complete);
            }
            thread::sleep(TICK.min(deadline - now));
        }
    }
}
