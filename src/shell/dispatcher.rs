use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::heartbeat::HeartbeatTimer;
use super::state::ShellState;
use crate::core::command::{Command, ParsedArgs};
use crate::core::commands::{
    Cmdlet, InstanceId, OperationalState, PluginContext, PluginDescriptor, PluginError,
    PluginInstance, PluginRegistry, SHORT_FORM_LEN,
};
use crate::error::DispatchError;
use crate::terminal::{Console, Tone};

/// Longest alias chain followed before it is treated as a loop.
pub const MAX_ALIAS_DEPTH: usize = 8;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// What one dispatch cycle did with a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Plugin {
        name: String,
        instance: InstanceId,
        state: OperationalState,
    },
    Cmdlet(Cmdlet),
    /// An alias expanded to this text, queued ahead of other waiting work.
    Expanded(String),
    Failed(DispatchError),
}

/// The command loop: takes queued commands one at a time and resolves,
/// authorizes and runs them.
pub struct Dispatcher {
    state: Arc<ShellState>,
    registry: Arc<PluginRegistry>,
    heartbeat: HeartbeatTimer,
    catch_errors: bool,
    last: Option<PluginInstance>,
}

impl Dispatcher {
    pub fn new(state: Arc<ShellState>, registry: Arc<PluginRegistry>) -> Self {
        Self {
            state,
            registry,
            heartbeat: HeartbeatTimer::new(Duration::ZERO),
            catch_errors: true,
            last: None,
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: HeartbeatTimer) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// With `false`, a panicking plugin takes the loop down with it.
    pub fn catch_errors(mut self, catch: bool) -> Self {
        self.catch_errors = catch;
        self
    }

    pub fn heartbeat_mut(&mut self) -> &mut HeartbeatTimer {
        &mut self.heartbeat
    }

    /// The plugin instance created by the most recent dispatch, if any.
    pub fn last_instance(&self) -> Option<&PluginInstance> {
        self.last.as_ref()
    }

    /// Runs until the exit token or an abort stops the shell.
    pub fn run(&mut self) {
        info!("dispatcher started");
        loop {
            self.between_commands();
            if self.dispatch_next().is_some() {
                continue;
            }
            if !self.state.is_alive() {
                break;
            }
            let timeout = self
                .heartbeat
                .until_due(Instant::now())
                .map_or(POLL_INTERVAL, |due| due.min(POLL_INTERVAL));
            self.state.wait_for_work(timeout);
        }
        info!("dispatcher stopped");
    }

    /// Dispatches everything already queued, including work queued along the way.
    pub fn run_until_idle(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        loop {
            self.between_commands();
            match self.dispatch_next() {
                Some(outcome) => outcomes.push(outcome),
                None => return outcomes,
            }
        }
    }

    /// Takes the next waiting command and carries it through one cycle.
    pub fn dispatch_next(&mut self) -> Option<Outcome> {
        let cmd = self.state.queue().next_waiting()?;
        let state = Arc::clone(&self.state);
        let mut console = state.console();
        let outcome = self.process(cmd, &mut **console);
        self.state.note_dispatched();
        Some(outcome)
    }

    fn between_commands(&mut self) {
        let swept = self.state.results().sweep();
        if swept > 0 {
            debug!(swept, "expired results dropped");
        }
        if self.state.is_alive() {
            let actor = self.state.actor();
            self.heartbeat.tick(Instant::now(), &actor, &self.registry);
        }
    }

    fn process(&mut self, cmd: Command, console: &mut dyn Console) -> Outcome {
        self.last = None;

        if self.state.echo_enabled() {
            let line = format!("{}{}", self.state.prompt(), cmd.text());
            let _ = console.write_line(Tone::Echo, &line);
        }

        // aliases see the text as typed; the environment pass happens once,
        // on the command that finally resolves
        let verb = cmd.verb().to_string();
        let is_alias = !self.is_command(&verb) && self.state.aliases().contains(&verb);
        if is_alias {
            return self.expand_alias(&cmd, &verb, console);
        }

        let expanded = self.state.environment().expand(cmd.text()).into_owned();
        let cmd = if expanded != cmd.text() {
            debug!(from = cmd.text(), to = %expanded, "environment expanded");
            cmd.rewritten(expanded)
        } else {
            cmd
        };

        let args = match cmd.args() {
            Ok(args) => args,
            Err(source) => {
                return self.fail(
                    console,
                    DispatchError::Parse {
                        command: cmd.text().to_string(),
                        source,
                    },
                )
            }
        };

        let verb = cmd.verb().to_string();
        if verb.len() > SHORT_FORM_LEN {
            if let Some(descriptor) = self.registry.lookup(&verb).cloned() {
                return self.run_plugin(&cmd, &args, &descriptor, console);
            }
        } else if let Some(cmdlet) = Cmdlet::from_verb(&verb) {
            return self.run_cmdlet(cmdlet, &cmd, console);
        }

        self.fail(console, DispatchError::Unresolved(verb))
    }

    /// Plugins and cmdlets win over aliases of the same name.
    fn is_command(&self, verb: &str) -> bool {
        if verb.len() > SHORT_FORM_LEN {
            self.registry.contains(verb)
        } else {
            Cmdlet::from_verb(verb).is_some()
        }
    }

    fn run_cmdlet(&mut self, cmdlet: Cmdlet, cmd: &Command, console: &mut dyn Console) -> Outcome {
        debug!(cmdlet = cmdlet.name(), actor = cmd.actor().name(), "running cmdlet");
        match cmdlet.run(cmd, console, &self.state) {
            Ok(()) => {
                self.state.clear_error_level();
                Outcome::Cmdlet(cmdlet)
            }
            Err(source) => self.fail(
                console,
                DispatchError::PluginExecution {
                    command: cmdlet.name().to_string(),
                    source,
                },
            ),
        }
    }

    fn expand_alias(&mut self, cmd: &Command, verb: &str, console: &mut dyn Console) -> Outcome {
        let Some(text) = self.state.aliases().resolve(verb, cmd.payload()) else {
            return self.fail(console, DispatchError::Unresolved(verb.to_string()));
        };

        let alias = verb.to_lowercase();
        let chain = cmd.alias_chain();
        if chain.contains(&alias) || chain.len() >= MAX_ALIAS_DEPTH {
            let mut chain = chain.to_vec();
            chain.push(alias.clone());
            return self.fail(console, DispatchError::AliasLoop { alias, chain });
        }

        debug!(alias = %alias, expansion = %text, "alias expanded");
        let next = cmd.expanded_from(&alias, text.clone());
        if let Err(e) = self.state.queue().insert_next(next) {
            warn!(alias = %alias, error = %e, "alias expansion dropped");
        }
        Outcome::Expanded(text)
    }

    fn run_plugin(
        &mut self,
        cmd: &Command,
        args: &ParsedArgs,
        descriptor: &PluginDescriptor,
        console: &mut dyn Console,
    ) -> Outcome {
        let name = descriptor.name.to_string();

        if let Err(source) = descriptor.schema.validate(&name, args) {
            return self.fail(
                console,
                DispatchError::Parse {
                    command: cmd.text().to_string(),
                    source,
                },
            );
        }

        let Some(mut instance) = self.registry.instantiate(&name) else {
            return self.fail(console, DispatchError::Unresolved(name));
        };

        let actor = cmd.actor();
        if !actor.rank().satisfies(descriptor.required_rank) {
            let err = DispatchError::Authorization {
                command: name,
                actor: actor.name().to_string(),
                required: descriptor.required_rank,
                actual: actor.rank(),
            };
            instance.record_error(err.clone());
            self.last = Some(instance);
            return self.fail(console, err);
        }

        debug!(command = %name, instance = %instance.id(), actor = actor.name(), "executing plugin");
        let cancel = self.state.begin_command();
        let (result, warnings) = {
            let mut ctx = PluginContext::new(
                actor,
                args,
                &cancel,
                &self.registry,
                instance.id(),
                &mut *console,
                &self.state,
            );
            let result = if self.catch_errors {
                panic::catch_unwind(AssertUnwindSafe(|| instance.execute(&mut ctx, cmd)))
                    .unwrap_or_else(|payload| Err(PluginError::Panicked(panic_message(payload))))
            } else {
                instance.execute(&mut ctx, cmd)
            };
            (result, ctx.warnings().len())
        };
        self.state.end_command();

        let outcome = self.finish(&mut instance, result, warnings, console);
        self.last = Some(instance);
        outcome
    }

    fn finish(
        &mut self,
        instance: &mut PluginInstance,
        result: Result<OperationalState, PluginError>,
        warnings: usize,
        console: &mut dyn Console,
    ) -> Outcome {
        let name = instance.descriptor().name.to_string();
        match result {
            Ok(state) => {
                let state = if warnings > 0 { state.with_errors() } else { state };
                instance.set_state(state);
                if matches!(
                    state,
                    OperationalState::Complete | OperationalState::CompleteWithErrors
                ) {
                    if let Some(result) = instance.take_result() {
                        self.state.results().publish(instance.id(), result);
                    }
                }
                if state.is_success() {
                    self.state.clear_error_level();
                } else {
                    self.state.set_error_level("4");
                }
                debug!(command = %name, ?state, "plugin finished");
                Outcome::Plugin {
                    name,
                    instance: instance.id(),
                    state,
                }
            }
            Err(PluginError::Abort) => self.abort(instance, name, console),
            Err(PluginError::Cancelled) if self.state.shutdown_token().is_cancelled() => {
                self.abort(instance, name, console)
            }
            Err(source) => {
                let state = if source == PluginError::Cancelled {
                    OperationalState::Cancelled
                } else {
                    OperationalState::IncompleteWithErrors
                };
                instance.set_state(state);
                let err = DispatchError::PluginExecution {
                    command: name,
                    source,
                };
                instance.record_error(err.clone());
                self.fail(console, err)
            }
        }
    }

    fn abort(
        &mut self,
        instance: &mut PluginInstance,
        name: String,
        console: &mut dyn Console,
    ) -> Outcome {
        instance.set_state(OperationalState::Cancelled);
        let err = DispatchError::FatalAbort(name);
        instance.record_error(err.clone());
        self.state.stop();
        self.fail(console, err)
    }

    fn fail(&mut self, console: &mut dyn Console, err: DispatchError) -> Outcome {
        match &err {
            DispatchError::FatalAbort(_) => error!(error = %err, "dispatch aborted"),
            DispatchError::PluginExecution { .. } => warn!(error = %err, "plugin failed"),
            _ => info!(error = %err, "command rejected"),
        }
        let _ = console.write_line(Tone::Error, &err.to_string());
        self.state.set_error_level(err.code());
        self.state.record_error(err.clone());
        Outcome::Failed(err)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
