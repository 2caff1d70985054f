//! Collaborators the shell talks to: keystroke source, console output and
//! clipboard. Backends live in submodules.

use std::io;
use std::time::Duration;

pub mod tty;
pub mod memory;

pub use memory::{MemoryClipboard, MemoryConsole, ScriptedKeys};

use crate::input::keys::Key;

/// Colour role of a line of console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Normal,
    Echo,
    Success,
    Error,
    Hint,
}

pub trait KeySource: Send {
    /// Waits up to `timeout` for one keystroke.
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<Key>>;
}

pub trait Console: Send {
    fn write_line(&mut self, tone: Tone, text: &str) -> io::Result<()>;

    /// Repaints the prompt and the line being edited, cursor at `cursor` chars.
    fn redraw_input(&mut self, prompt: &str, line: &str, cursor: usize) -> io::Result<()>;

    fn clear_screen(&mut self) -> io::Result<()>;
}

pub trait Clipboard: Send {
    fn get(&mut self) -> Option<String>;
    fn set(&mut self, text: String);
}
