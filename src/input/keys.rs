/// A keystroke as seen by the input loop, independent of the terminal backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Ctrl(char),
    Alt(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    Left,
    Right,
    WordLeft,
    WordRight,
    Home,
    End,
    Up,
    Down,
    Esc,
    /// The host asked the shell to close (window close, SIGTERM, SIGHUP).
    Close,
}

/// What a keystroke does to the line being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    Insert(char),
    DeleteBack,
    DeleteForward,
    Left,
    Right,
    WordLeft,
    WordRight,
    Home,
    End,
    HistoryPrevious,
    HistoryNext,
    Complete,
    Cut,
    Copy,
    Paste,
    InsertTimestamp,
    Clear,
    Interrupt,
    Submit,
    EndOfInput,
    ForceExit,
}

impl EditAction {
    pub fn from_key(key: Key) -> Option<Self> {
        let action = match key {
            Key::Char(c) if !c.is_control() => EditAction::Insert(c),
            Key::Char(_) => return None,
            Key::Enter => EditAction::Submit,
            Key::Tab => EditAction::Complete,
            Key::Backspace | Key::Ctrl('h') => EditAction::DeleteBack,
            Key::Delete => EditAction::DeleteForward,
            Key::Left | Key::Ctrl('b') => EditAction::Left,
            Key::Right | Key::Ctrl('f') => EditAction::Right,
            Key::WordLeft | Key::Alt('b') => EditAction::WordLeft,
            Key::WordRight | Key::Alt('f') => EditAction::WordRight,
            Key::Home | Key::Ctrl('a') => EditAction::Home,
            Key::End | Key::Ctrl('e') => EditAction::End,
            Key::Up | Key::Ctrl('p') => EditAction::HistoryPrevious,
            Key::Down | Key::Ctrl('n') => EditAction::HistoryNext,
            Key::Ctrl('x') => EditAction::Cut,
            Key::Ctrl('y') => EditAction::Copy,
            Key::Ctrl('v') => EditAction::Paste,
            Key::Ctrl('t') => EditAction::InsertTimestamp,
            Key::Ctrl('c') => EditAction::Interrupt,
            Key::Ctrl('d') => EditAction::EndOfInput,
            Key::Esc => EditAction::Clear,
            Key::Close => EditAction::ForceExit,
            Key::Ctrl(_) | Key::Alt(_) => return None,
        };
        Some(action)
    }
}
