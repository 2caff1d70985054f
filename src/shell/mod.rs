//! The embeddable shell: shared state, the dispatch loop and the host API.

use std::sync::Arc;
use std::thread;

use tracing::{error, info};

pub mod dispatcher;
pub mod heartbeat;
pub mod state;

pub use dispatcher::{Dispatcher, Outcome, MAX_ALIAS_DEPTH};
pub use heartbeat::HeartbeatTimer;
pub use state::{Session, ShellState};

use crate::core::actor::Actor;
use crate::core::command::Command;
use crate::core::commands::{LoggedError, PluginRegistry, RegistrySnapshot};
use crate::core::config::ShellConfig;
use crate::core::rank::RankLevel;
use crate::error::ShellError;
use crate::input::InputReader;
use crate::terminal::{Clipboard, Console, KeySource};

pub struct Shell {
    state: Arc<ShellState>,
    registry: Arc<PluginRegistry>,
    dispatcher: Dispatcher,
}

impl Shell {
    pub fn new(
        config: &ShellConfig,
        registry: PluginRegistry,
        console: Box<dyn Console>,
        clipboard: Box<dyn Clipboard>,
    ) -> Self {
        let state = ShellState::new(config, console).with_clipboard(clipboard);
        Self::with_state(config, registry, state)
    }

    /// For hosts that bring their own store or credential directory.
    pub fn with_state(config: &ShellConfig, registry: PluginRegistry, state: ShellState) -> Self {
        let state = Arc::new(state);
        let registry = Arc::new(registry);
        let dispatcher = Dispatcher::new(Arc::clone(&state), Arc::clone(&registry))
            .with_heartbeat(HeartbeatTimer::new(config.heartbeat))
            .catch_errors(config.catch_errors);
        Self {
            state,
            registry,
            dispatcher,
        }
    }

    /// Queues `text` for `actor`. Commands registered with
    /// [`PluginDescriptor::no_history`] are never cached, whatever
    /// `allow_cache` says.
    ///
    /// [`PluginDescriptor::no_history`]: crate::core::commands::PluginDescriptor::no_history
    pub fn enqueue(&self, text: &str, actor: Actor, allow_cache: bool) -> Result<(), ShellError> {
        let keep = allow_cache && self.registry.keeps_history(text, &self.state.aliases());
        self.state.enqueue(Command::new(text, actor).with_cache(keep))?;
        Ok(())
    }

    /// Resets the session actor: `Unverified` until `LOGIN` when
    /// `require_auth` is set, `default_rank` otherwise.
    pub fn activate(&self, require_auth: bool, default_rank: RankLevel) {
        let rank = if require_auth {
            RankLevel::Unverified
        } else {
            default_rank
        };
        let actor = self.state.actor().with_rank(rank);
        self.state.session_mut().require_auth = require_auth;
        self.state.set_actor(actor);
    }

    pub fn prompt(&self) -> String {
        self.state.prompt()
    }

    pub fn set_prompt(&self, prompt: impl Into<String>) {
        self.state.set_prompt(prompt);
    }

    pub fn on_heartbeat<F>(&mut self, subscriber: F)
    where
        F: FnMut(&Actor, &RegistrySnapshot) + Send + 'static,
    {
        self.dispatcher.heartbeat_mut().subscribe(Box::new(subscriber));
    }

    pub fn error_level(&self) -> String {
        self.state.error_level()
    }

    pub fn errors(&self) -> Vec<LoggedError> {
        self.state.errors()
    }

    pub fn request_exit(&self) {
        self.state.request_exit();
    }

    pub fn interrupt(&self) -> bool {
        self.state.interrupt()
    }

    pub fn is_alive(&self) -> bool {
        self.state.is_alive()
    }

    pub fn state(&self) -> &Arc<ShellState> {
        &self.state
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Dispatches what is queued now, on the caller's thread.
    pub fn run_pending(&mut self) -> Vec<Outcome> {
        self.dispatcher.run_until_idle()
    }

    /// Runs only the dispatch loop until the exit token; input comes from
    /// [`Shell::enqueue`].
    pub fn run_dispatcher(&mut self) {
        self.dispatcher.run();
    }

    /// Reads keys on a background thread and dispatches on this one until
    /// the shell exits.
    pub fn run<K>(&mut self, keys: K) -> Result<(), ShellError>
    where
        K: KeySource + 'static,
    {
        let reader = InputReader::new(keys, Arc::clone(&self.state), Arc::clone(&self.registry));
        let state = Arc::clone(&self.state);
        let input = thread::Builder::new()
            .name("conch-input".into())
            .spawn(move || {
                let result = reader.run();
                if let Err(e) = &result {
                    error!(error = %e, "input reader failed");
                    state.request_exit();
                }
                result
            })?;

        self.dispatcher.run();
        info!("waiting for input reader");
        match input.join() {
            Ok(result) => Ok(result?),
            Err(_) => Err(ShellError::InputThread),
        }
    }
}
