//! In-memory terminal collaborators for tests and headless hosts.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::{Clipboard, Console, KeySource, Tone};
use crate::input::keys::Key;

/// Records every line written; clones share the same transcript.
#[derive(Debug, Clone, Default)]
pub struct MemoryConsole {
    lines: Arc<Mutex<Vec<(Tone, String)>>>,
    input: Arc<Mutex<(String, usize)>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Tone, String)> {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn text(&self) -> Vec<String> {
        self.lines().into_iter().map(|(_, text)| text).collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|(_, text)| text.contains(needle))
    }

    /// The last input line drawn and its cursor.
    pub fn input(&self) -> (String, usize) {
        self.input
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Console for MemoryConsole {
    fn write_line(&mut self, tone: Tone, text: &str) -> io::Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((tone, text.to_string()));
        Ok(())
    }

    fn redraw_input(&mut self, _prompt: &str, line: &str, cursor: usize) -> io::Result<()> {
        *self.input.lock().unwrap_or_else(|e| e.into_inner()) = (line.to_string(), cursor);
        Ok(())
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clear();
        Ok(())
    }
}

/// Replays a fixed list of keys, then reports `Close` once and goes quiet.
#[derive(Debug, Default)]
pub struct ScriptedKeys {
    keys: VecDeque<Key>,
    closed: bool,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            closed: false,
        }
    }

    /// Keys that type `text` followed by Enter.
    pub fn line(text: &str) -> Vec<Key> {
        text.chars()
            .map(Key::Char)
            .chain(std::iter::once(Key::Enter))
            .collect()
    }
}

impl KeySource for ScriptedKeys {
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<Key>> {
        if let Some(key) = self.keys.pop_front() {
            return Ok(Some(key));
        }
        if self.closed {
            thread::sleep(timeout);
            return Ok(None);
        }
        self.closed = true;
        Ok(Some(Key::Close))
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    content: Option<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for MemoryClipboard {
    fn get(&mut self) -> Option<String> {
        self.content.clone()
    }

    fn set(&mut self, text: String) {
        self.content = Some(text);
    }
}
