//! Process-level plumbing: OS signals routed into the shell.

pub mod signal;

pub use signal::{forward_interrupts, CloseSignal};
