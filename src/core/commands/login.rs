use tracing::{info, warn};

use super::{ArgSchema, OperationalState, Plugin, PluginContext, PluginDescriptor, PluginError};
use crate::core::command::Command;
use crate::core::rank::RankLevel;
use crate::terminal::Tone;

/// Swaps the session actor for one vouched for by the credential directory.
#[derive(Debug, Default)]
pub struct LoginCommand;

impl Plugin for LoginCommand {
    fn descriptor() -> PluginDescriptor {
        PluginDescriptor::builtin("login", RankLevel::None)
            .schema(ArgSchema::positionals(2, Some(2)))
            .no_history()
            .help("Sign in as another user.\nLOGIN <name> <secret>")
    }

    fn execute(
        &mut self,
        ctx: &mut PluginContext<'_>,
        _cmd: &Command,
    ) -> Result<OperationalState, PluginError> {
        let args = ctx.args;
        let (name, secret) = match (args.positional(0), args.positional(1)) {
            (Some(name), Some(secret)) => (name, secret),
            _ => return Err(PluginError::InvalidArguments("LOGIN <name> <secret>".into())),
        };

        let Some(actor) = ctx.shell().directory().authenticate(name, secret) else {
            warn!(user = name, "login rejected");
            return Err(PluginError::Failed(format!("login failed for {}", name)));
        };

        info!(user = actor.name(), rank = %actor.rank(), "login accepted");
        let greeting = format!("signed in as {}", actor);
        ctx.shell().set_actor(actor);
        ctx.print_tone(Tone::Success, &greeting)?;
        Ok(OperationalState::Complete)
    }
}
