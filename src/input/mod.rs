pub mod completer;
pub mod editor;
pub mod keys;
mod reader;

pub use completer::{complete_verb, Completion};
pub use editor::LineBuffer;
pub use keys::{EditAction, Key};
pub use reader::{InputReader, KEY_POLL};
