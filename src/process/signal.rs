use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use signal_hook::consts::{SIGHUP, SIGTERM};
use tracing::{debug, info};

use crate::error::ShellError;
use crate::input::KEY_POLL;
use crate::shell::state::ShellState;

/// SIGTERM and SIGHUP, latched into a flag the input side turns into a
/// force-exit.
#[derive(Debug, Clone)]
pub struct CloseSignal {
    raised: Arc<AtomicBool>,
}

impl CloseSignal {
    pub fn register() -> Result<Self, ShellError> {
        let raised = Arc::new(AtomicBool::new(false));
        for signal in [SIGTERM, SIGHUP] {
            signal_hook::flag::register(signal, Arc::clone(&raised))
                .map_err(|e| ShellError::Signal(format!("signal {}: {}", signal, e)))?;
        }
        debug!("close signals registered");
        Ok(Self { raised })
    }

    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.raised)
    }

    /// Watches the flag when no key source does, e.g. in batch mode.
    pub fn spawn_watcher(&self, state: Arc<ShellState>) -> Result<JoinHandle<()>, ShellError> {
        let raised = self.flag();
        let handle = thread::Builder::new()
            .name("conch-signals".into())
            .spawn(move || {
                while state.is_alive() {
                    if raised.swap(false, Ordering::SeqCst) {
                        info!("close signal received");
                        state.request_exit();
                    }
                    thread::sleep(KEY_POLL);
                }
            })?;
        Ok(handle)
    }
}

/// Routes SIGINT to the running command; with nothing running it closes
/// the shell. Only needed outside raw mode, where Ctrl+C arrives as a key.
pub fn forward_interrupts(state: Arc<ShellState>) -> Result<(), ShellError> {
    ctrlc::set_handler(move || {
        if !state.interrupt() {
            state.request_exit();
        }
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ShellConfig;
    use crate::terminal::MemoryConsole;

    #[test]
    fn test_watcher_turns_flag_into_exit() {
        let state = Arc::new(ShellState::new(&ShellConfig::new(), Box::new(MemoryConsole::new())));
        let signal = CloseSignal {
            raised: Arc::new(AtomicBool::new(true)),
        };

        let watcher = signal.spawn_watcher(Arc::clone(&state)).unwrap();
        while !state.shutdown_token().is_cancelled() {
            thread::sleep(KEY_POLL);
        }
        state.stop();
        watcher.join().unwrap();

        assert!(!signal.flag().load(Ordering::SeqCst));
    }
}
