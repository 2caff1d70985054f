use super::{OperationalState, Plugin, PluginContext, PluginDescriptor, PluginError};
use crate::core::command::Command;
use crate::core::rank::RankLevel;

#[derive(Debug, Default)]
pub struct PrintCommand;

impl Plugin for PrintCommand {
    fn descriptor() -> PluginDescriptor {
        PluginDescriptor::builtin("print", RankLevel::None).help("Print the rest of the line.")
    }

    fn execute(
        &mut self,
        ctx: &mut PluginContext<'_>,
        cmd: &Command,
    ) -> Result<OperationalState, PluginError> {
        ctx.print(cmd.payload())?;
        Ok(OperationalState::Complete)
    }
}
