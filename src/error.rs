use crate::core::command::ParseError;
use crate::core::commands::{PluginError, RegistryError};
use crate::core::config::ConfigError;
use crate::core::queue::QueueError;
use crate::core::rank::RankLevel;

/// Failure of one dispatch cycle, reported to the actor and logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("{command}: {source}")]
    Parse { command: String, source: ParseError },
    #[error("{command}: requires {required}, {actor} is {actual}")]
    Authorization {
        command: String,
        actor: String,
        required: RankLevel,
        actual: RankLevel,
    },
    #[error("unknown command: {0}")]
    Unresolved(String),
    #[error("alias loop: {}", .chain.join(" -> "))]
    AliasLoop { alias: String, chain: Vec<String> },
    #[error("{command} failed: {source}")]
    PluginExecution { command: String, source: PluginError },
    #[error("aborted: {0}")]
    FatalAbort(String),
}

impl DispatchError {
    /// Value stored in the error-level variable for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::Parse { .. } => "1",
            DispatchError::Unresolved(_) | DispatchError::AliasLoop { .. } => "2",
            DispatchError::Authorization { .. } => "3",
            DispatchError::PluginExecution { .. } => "4",
            DispatchError::FatalAbort(_) => "5",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("Flag error: {0}")]
    FlagError(String),
    #[error("Signal error: {0}")]
    Signal(String),
    #[error("input thread panicked")]
    InputThread,
}

impl From<ctrlc::Error> for ShellError {
    fn from(err: ctrlc::Error) -> Self {
        ShellError::Signal(err.to_string())
    }
}
