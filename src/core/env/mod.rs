mod vars;

pub use vars::{EnvironmentTable, EnvironmentVariable};

/// Owner recorded for variables created by the shell itself.
pub const SYSTEM_OWNER: &str = "system";

/// Set to a non-empty code when the last dispatch failed.
pub const ERROR_LEVEL: &str = "ERRORLEVEL";

/// Controls whether the dispatcher echoes each command before running it.
pub const ECHO: &str = "ECHO";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvError {
    #[error("invalid variable name: {0:?}")]
    InvalidName(String),
    #[error("variable {name} is read-only (owned by {owner})")]
    ReadOnly { name: String, owner: String },
    #[error("variable not found: {0}")]
    VarNotFound(String),
}
