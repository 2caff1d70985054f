use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tracing::{debug, info, warn};

use super::completer::{complete_verb, Completion};
use super::editor::LineBuffer;
use super::keys::{EditAction, Key};
use crate::core::command::Command;
use crate::core::commands::PluginRegistry;
use crate::shell::state::ShellState;
use crate::terminal::{Console, KeySource, Tone};

/// Keystroke poll interval.
pub const KEY_POLL: Duration = Duration::from_millis(10);

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The input loop: turns keystrokes into queued commands.
///
/// Keys are applied only while the reader holds the console. When the
/// dispatcher owns it, keys wait in `pending`; interrupt and force-exit
/// still act at once since they need no screen.
pub struct InputReader<K: KeySource> {
    keys: K,
    state: Arc<ShellState>,
    registry: Arc<PluginRegistry>,
    line: LineBuffer,
    pending: VecDeque<Key>,
    seen_dispatches: u64,
    dirty: bool,
    exit_requested: bool,
}

impl<K: KeySource> InputReader<K> {
    pub fn new(keys: K, state: Arc<ShellState>, registry: Arc<PluginRegistry>) -> Self {
        let seen_dispatches = state.dispatched();
        Self {
            keys,
            state,
            registry,
            line: LineBuffer::new(),
            pending: VecDeque::new(),
            seen_dispatches,
            dirty: true,
            exit_requested: false,
        }
    }

    pub fn line(&self) -> &LineBuffer {
        &self.line
    }

    pub fn run(mut self) -> io::Result<()> {
        info!("input reader started");
        while self.state.is_alive() {
            if let Some(key) = self.keys.poll_key(KEY_POLL)? {
                self.pending.push_back(key);
            }
            self.pump()?;
        }
        info!("input reader stopped");
        Ok(())
    }

    /// One keystroke-processing pass.
    pub fn pump(&mut self) -> io::Result<()> {
        let dispatched = self.state.dispatched();
        if dispatched != self.seen_dispatches {
            self.seen_dispatches = dispatched;
            self.dirty = true;
        }
        if self.pending.is_empty() && !self.dirty {
            return Ok(());
        }

        let state = Arc::clone(&self.state);
        let Some(mut console) = state.try_console() else {
            self.out_of_band();
            return Ok(());
        };

        while let Some(key) = self.pending.pop_front() {
            if let Some(action) = EditAction::from_key(key) {
                self.apply(action, &mut **console)?;
            }
        }
        if self.state.is_alive() && !self.exit_requested {
            console.redraw_input(&self.state.prompt(), self.line.text(), self.line.cursor())?;
        }
        self.dirty = false;
        Ok(())
    }

    /// Handles the keys that must not wait for the console.
    fn out_of_band(&mut self) {
        let state = Arc::clone(&self.state);
        let mut exit = false;
        self.pending.retain(|key| match EditAction::from_key(*key) {
            Some(EditAction::Interrupt) => !state.interrupt(),
            Some(EditAction::ForceExit) => {
                exit = true;
                false
            }
            _ => true,
        });
        if exit {
            self.force_exit();
        }
    }

    fn force_exit(&mut self) {
        if !self.exit_requested {
            self.exit_requested = true;
            self.state.request_exit();
        }
    }

    pub fn apply(&mut self, action: EditAction, console: &mut dyn Console) -> io::Result<()> {
        match action {
            EditAction::Insert(c) => self.line.insert(c),
            EditAction::DeleteBack => {
                self.line.delete_back();
            }
            EditAction::DeleteForward => {
                self.line.delete_forward();
            }
            EditAction::Left => self.line.left(),
            EditAction::Right => self.line.right(),
            EditAction::WordLeft => self.line.word_left(),
            EditAction::WordRight => self.line.word_right(),
            EditAction::Home => self.line.home(),
            EditAction::End => self.line.end(),
            EditAction::HistoryPrevious => {
                let text = self.state.queue().previous().to_string();
                self.line.set(&text);
            }
            EditAction::HistoryNext => {
                let text = self.state.queue().next().to_string();
                self.line.set(&text);
            }
            EditAction::Complete => self.complete(console)?,
            EditAction::Cut => {
                let text = self.line.take();
                self.state.clipboard().set(text);
            }
            EditAction::Copy => {
                let text = self.line.text().to_string();
                self.state.clipboard().set(text);
            }
            EditAction::Paste => {
                let pasted = self.state.clipboard().get();
                if let Some(text) = pasted {
                    self.line.insert_str(&text.replace(['\r', '\n'], " "));
                }
            }
            EditAction::InsertTimestamp => {
                let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
                self.line.insert_str(&stamp);
            }
            EditAction::Clear => self.line.clear(),
            EditAction::Interrupt => {
                if !self.state.interrupt() {
                    self.line.clear();
                }
            }
            EditAction::Submit => self.submit(console)?,
            EditAction::EndOfInput => {
                if self.line.is_empty() {
                    self.force_exit();
                } else {
                    self.line.delete_forward();
                }
            }
            EditAction::ForceExit => self.force_exit(),
        }
        Ok(())
    }

    fn complete(&mut self, console: &mut dyn Console) -> io::Result<()> {
        let Some(verb) = self.line.verb_at_cursor().map(str::to_string) else {
            return Ok(());
        };
        let rank = self.state.actor().rank();
        let completion = complete_verb(&verb, &self.registry, &self.state.aliases(), rank);
        match completion {
            Completion::Unique(text) | Completion::Partial(text) => self.line.replace_verb(&text),
            Completion::Ambiguous(names) => console.write_line(Tone::Hint, &names.join("  "))?,
            Completion::NoMatch => {}
        }
        Ok(())
    }

    fn submit(&mut self, console: &mut dyn Console) -> io::Result<()> {
        let text = self.line.take();
        let prompt = self.state.prompt();
        console.write_line(Tone::Normal, &format!("{}{}", prompt, text))?;
        if text.trim().is_empty() {
            return Ok(());
        }

        let keep = self.registry.keeps_history(&text, &self.state.aliases());
        let cmd = Command::new(text, self.state.actor()).with_cache(keep);
        debug!(command = cmd.text(), "command entered");
        if let Err(e) = self.state.enqueue(cmd) {
            warn!(error = %e, "command not queued");
        }
        Ok(())
    }
}
