//! Raw-mode terminal backend built on crossterm.

use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::cursor::{MoveTo, MoveToColumn};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType};
use crossterm::queue;

use super::{Console, KeySource, Tone};
use crate::highlight::Palette;
use crate::input::keys::Key;

/// Keeps the terminal in raw mode for as long as it lives.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

pub struct TtyKeys {
    close_requested: Arc<AtomicBool>,
}

impl TtyKeys {
    /// `close_requested` is raised by the signal watcher; it is turned into
    /// a single [`Key::Close`].
    pub fn new(close_requested: Arc<AtomicBool>) -> Self {
        Self { close_requested }
    }
}

impl KeySource for TtyKeys {
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<Key>> {
        if self.close_requested.swap(false, Ordering::SeqCst) {
            return Ok(Some(Key::Close));
        }
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => Ok(map_key(key)),
            _ => Ok(None),
        }
    }
}

fn map_key(event: KeyEvent) -> Option<Key> {
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let alt = event.modifiers.contains(KeyModifiers::ALT);
    let key = match event.code {
        KeyCode::Char(c) if ctrl => Key::Ctrl(c.to_ascii_lowercase()),
        KeyCode::Char(c) if alt => Key::Alt(c.to_ascii_lowercase()),
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Left if ctrl => Key::WordLeft,
        KeyCode::Right if ctrl => Key::WordRight,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Esc => Key::Esc,
        _ => return None,
    };
    Some(key)
}

pub struct TtyConsole {
    out: Stdout,
    palette: Palette,
}

impl Default for TtyConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl TtyConsole {
    pub fn new() -> Self {
        Self {
            out: io::stdout(),
            palette: Palette::new(),
        }
    }
}

impl Console for TtyConsole {
    fn write_line(&mut self, tone: Tone, text: &str) -> io::Result<()> {
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        for line in text.lines() {
            queue!(self.out, Print(self.palette.paint(tone, line)), Print("\r\n"))?;
        }
        self.out.flush()
    }

    fn redraw_input(&mut self, prompt: &str, line: &str, cursor: usize) -> io::Result<()> {
        let column = prompt.chars().count() + cursor;
        queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(prompt),
            Print(self.palette.highlight_command(line)),
            MoveToColumn(u16::try_from(column).unwrap_or(u16::MAX))
        )?;
        self.out.flush()
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        self.out.flush()
    }
}

/// Plain line-oriented console for piped (non-terminal) sessions.
pub struct LineConsole {
    out: Stdout,
}

impl Default for LineConsole {
    fn default() -> Self {
        Self { out: io::stdout() }
    }
}

impl Console for LineConsole {
    fn write_line(&mut self, _tone: Tone, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)
    }

    fn redraw_input(&mut self, _prompt: &str, _line: &str, _cursor: usize) -> io::Result<()> {
        Ok(())
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_key() {
        let ctrl_a = KeyEvent::new(KeyCode::Char('A'), KeyModifiers::CONTROL);
        assert_eq!(map_key(ctrl_a), Some(Key::Ctrl('a')));

        let word_left = KeyEvent::new(KeyCode::Left, KeyModifiers::CONTROL);
        assert_eq!(map_key(word_left), Some(Key::WordLeft));

        let plain = KeyEvent::new(KeyCode::Char('z'), KeyModifiers::NONE);
        assert_eq!(map_key(plain), Some(Key::Char('z')));

        let f5 = KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE);
        assert_eq!(map_key(f5), None);
    }
}
