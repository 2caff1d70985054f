use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{
    Arc, Condvar, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError,
};
use std::time::Duration;

use chrono::Local;
use tracing::{debug, info};

use crate::core::actor::{Actor, Directory, StaticDirectory};
use crate::core::cancel::CancelToken;
use crate::core::command::Command;
use crate::core::commands::builtin::EXIT_TOKEN;
use crate::core::commands::{LoggedError, ResultPool};
use crate::core::config::{AliasTable, ShellConfig};
use crate::core::env::{EnvironmentTable, ECHO, ERROR_LEVEL};
use crate::core::queue::{CommandQueue, QueueError};
use crate::core::rank::RankLevel;
use crate::core::store::{ConfigStore, MemoryStore, PluginStore};
use crate::error::DispatchError;
use crate::terminal::{Clipboard, Console, MemoryClipboard};

const ERROR_LOG_LIMIT: usize = 100;

/// Who is typing at the keyboard and how the prompt looks.
#[derive(Debug, Clone)]
pub struct Session {
    pub actor: Actor,
    pub prompt: String,
    pub require_auth: bool,
}

/// State shared by the input loop, the dispatcher and running plugins.
///
/// The console mutex is the gate between the two loops: whoever holds it
/// owns the screen. It is always taken before any other lock here, and the
/// queue lock is never held while waiting for it.
pub struct ShellState {
    queue: Mutex<CommandQueue>,
    wake: Condvar,
    console: Mutex<Box<dyn Console>>,
    clipboard: Mutex<Box<dyn Clipboard>>,
    aliases: RwLock<AliasTable>,
    environment: RwLock<EnvironmentTable>,
    session: RwLock<Session>,
    keep_alive: AtomicBool,
    shutdown: CancelToken,
    current: Mutex<Option<CancelToken>>,
    dispatched: AtomicU64,
    results: ResultPool,
    errors: Mutex<VecDeque<LoggedError>>,
    store: Arc<dyn ConfigStore>,
    directory: Arc<dyn Directory>,
}

impl ShellState {
    pub fn new(config: &ShellConfig, console: Box<dyn Console>) -> Self {
        let mut environment = config.environment.clone();
        let echo = if config.echo { "on" } else { "off" };
        let _ = environment.set(ECHO, echo, &Actor::system());
        let _ = environment.set_read_only(ERROR_LEVEL, "", &Actor::system());

        let rank = if config.require_auth {
            RankLevel::Unverified
        } else {
            config.default_rank
        };

        Self {
            queue: Mutex::new(CommandQueue::new(config.cache_limit)),
            wake: Condvar::new(),
            console: Mutex::new(console),
            clipboard: Mutex::new(Box::new(MemoryClipboard::new())),
            aliases: RwLock::new(config.aliases.clone()),
            environment: RwLock::new(environment),
            session: RwLock::new(Session {
                actor: Actor::new(default_user_name(), rank),
                prompt: config.prompt.clone(),
                require_auth: config.require_auth,
            }),
            keep_alive: AtomicBool::new(true),
            shutdown: CancelToken::new(),
            current: Mutex::new(None),
            dispatched: AtomicU64::new(0),
            results: ResultPool::new(),
            errors: Mutex::new(VecDeque::new()),
            store: Arc::new(MemoryStore::new()),
            directory: Arc::new(StaticDirectory::new()),
        }
    }

    pub fn with_clipboard(self, clipboard: Box<dyn Clipboard>) -> Self {
        Self {
            clipboard: Mutex::new(clipboard),
            ..self
        }
    }

    pub fn with_store(self, store: Arc<dyn ConfigStore>) -> Self {
        Self { store, ..self }
    }

    pub fn with_directory(self, directory: Arc<dyn Directory>) -> Self {
        Self { directory, ..self }
    }

    pub fn queue(&self) -> MutexGuard<'_, CommandQueue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn enqueue(&self, cmd: Command) -> Result<(), QueueError> {
        self.queue().enqueue(cmd)?;
        self.wake.notify_all();
        Ok(())
    }

    /// Sleeps until a command is waiting, the shell stops or `timeout` passes.
    pub fn wait_for_work(&self, timeout: Duration) -> bool {
        let queue = self.queue();
        if queue.is_active() || !self.is_alive() {
            return queue.is_active();
        }
        let (queue, _) = self
            .wake
            .wait_timeout_while(queue, timeout, |q| !q.is_active() && self.is_alive())
            .unwrap_or_else(|e| e.into_inner());
        queue.is_active()
    }

    pub fn console(&self) -> MutexGuard<'_, Box<dyn Console>> {
        self.console.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The console, unless someone else is using it right now.
    pub fn try_console(&self) -> Option<MutexGuard<'_, Box<dyn Console>>> {
        match self.console.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(e)) => Some(e.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Count of finished dispatch cycles; the input loop repaints when it moves.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::SeqCst)
    }

    pub fn note_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
    }

    pub fn clipboard(&self) -> MutexGuard<'_, Box<dyn Clipboard>> {
        self.clipboard.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn aliases(&self) -> RwLockReadGuard<'_, AliasTable> {
        self.aliases.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn aliases_mut(&self) -> RwLockWriteGuard<'_, AliasTable> {
        self.aliases.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn environment(&self) -> RwLockReadGuard<'_, EnvironmentTable> {
        self.environment.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn environment_mut(&self) -> RwLockWriteGuard<'_, EnvironmentTable> {
        self.environment.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn session(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn session_mut(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(|e| e.into_inner())
    }

    /// The actor commands typed at the keyboard run as.
    pub fn actor(&self) -> Actor {
        self.session().actor.clone()
    }

    pub fn set_actor(&self, actor: Actor) {
        info!(actor = actor.name(), rank = %actor.rank(), "session actor changed");
        self.session_mut().actor = actor;
    }

    pub fn prompt(&self) -> String {
        self.session().prompt.clone()
    }

    pub fn set_prompt(&self, prompt: impl Into<String>) {
        self.session_mut().prompt = prompt.into();
    }

    pub fn is_alive(&self) -> bool {
        self.keep_alive.load(Ordering::SeqCst)
    }

    /// Clears KeepAlive: no new work is accepted and waiting commands are dropped.
    pub fn stop(&self) {
        self.keep_alive.store(false, Ordering::SeqCst);
        {
            let mut queue = self.queue();
            queue.close();
            queue.discard_pending();
        }
        self.wake.notify_all();
    }

    pub fn shutdown_token(&self) -> &CancelToken {
        &self.shutdown
    }

    /// Force-exit: queue the exit token and cancel whatever is running.
    pub fn request_exit(&self) {
        info!("exit requested");
        let _ = self.enqueue(Command::new(EXIT_TOKEN, Actor::system()));
        self.shutdown.cancel();
        self.wake.notify_all();
    }

    /// Starts a command and returns the token its plugin will see.
    pub fn begin_command(&self) -> CancelToken {
        let token = self.shutdown.child();
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.clone());
        token
    }

    pub fn end_command(&self) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Cancels the in-flight command, if any.
    pub fn interrupt(&self) -> bool {
        match self.current.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            Some(token) => {
                debug!("interrupting running command");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    pub fn error_level(&self) -> String {
        self.environment()
            .get(ERROR_LEVEL)
            .unwrap_or_default()
            .to_string()
    }

    pub fn set_error_level(&self, code: &str) {
        let _ = self
            .environment_mut()
            .set_read_only(ERROR_LEVEL, code, &Actor::system());
    }

    pub fn clear_error_level(&self) {
        self.set_error_level("");
    }

    pub fn echo_enabled(&self) -> bool {
        self.environment().is_enabled(ECHO)
    }

    pub fn record_error(&self, error: DispatchError) {
        let mut errors = self.errors.lock().unwrap_or_else(|e| e.into_inner());
        errors.push_back(LoggedError {
            at: Local::now(),
            error,
        });
        while errors.len() > ERROR_LOG_LIMIT {
            errors.pop_front();
        }
    }

    pub fn errors(&self) -> Vec<LoggedError> {
        self.errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn results(&self) -> &ResultPool {
        &self.results
    }

    pub fn plugin_store(&self) -> PluginStore {
        PluginStore::new(Arc::clone(&self.store))
    }

    pub fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }
}

fn default_user_name() -> String {
    dirs::home_dir()
        .and_then(|home| home.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "user".to_string())
}
