//! Rank-gated command handlers ("plugins") and the short-form cmdlets.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use semver::Version;

mod alias;
pub mod builtin;
mod help;
mod history;
mod login;
mod print;
pub mod registry;
pub mod results;
mod settings;
mod source;
mod wait;

pub use alias::{AliasCommand, UnaliasCommand};
pub use builtin::Cmdlet;
pub use help::HelpCommand;
pub use history::HistoryCommand;
pub use login::LoginCommand;
pub use print::PrintCommand;
pub use registry::{PluginFactory, PluginRegistry, RegistryError, RegistrySnapshot};
pub use results::{ResultPool, SharedResult};
pub use settings::SettingsCommand;
pub use source::SourceCommand;
pub use wait::WaitCommand;

use super::actor::Actor;
use super::cancel::CancelToken;
use super::command::{Command, ParseError, ParsedArgs};
use super::config::AliasError;
use super::env::EnvError;
use super::queue::QueueError;
use super::rank::RankLevel;
use super::store::{PluginStore, StoreError};
use crate::error::DispatchError;
use crate::shell::state::ShellState;
use crate::terminal::{Console, Tone};

/// Verbs of this length or shorter are cmdlets, longer ones are plugins.
pub const SHORT_FORM_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PluginError {
    #[error("{0}")]
    Failed(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("cancelled")]
    Cancelled,
    #[error("abort requested")]
    Abort,
    #[error("panicked: {0}")]
    Panicked(String),
    #[error("console error: {0}")]
    Console(String),
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error(transparent)]
    Alias(#[from] AliasError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl From<std::io::Error> for PluginError {
    fn from(err: std::io::Error) -> Self {
        PluginError::Console(err.to_string())
    }
}

/// Validated plugin command name: a letter followed by at least three of
/// `A-Z 0-9 _ -`, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandName(String);

impl CommandName {
    pub fn new(name: &str) -> Result<Self, RegistryError> {
        let upper = name.trim().to_ascii_uppercase();
        let valid = upper.len() > SHORT_FORM_LEN
            && upper.starts_with(|c: char| c.is_ascii_alphabetic())
            && upper
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(upper))
        } else {
            Err(RegistryError::InvalidName(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shape of the arguments a plugin accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSchema {
    pub min_positionals: usize,
    pub max_positionals: Option<usize>,
    /// Known switch names; `None` accepts any switch.
    pub switches: Option<Vec<&'static str>>,
}

impl Default for ArgSchema {
    fn default() -> Self {
        Self::any()
    }
}

impl ArgSchema {
    pub fn any() -> Self {
        Self {
            min_positionals: 0,
            max_positionals: None,
            switches: None,
        }
    }

    pub fn none() -> Self {
        Self {
            min_positionals: 0,
            max_positionals: Some(0),
            switches: Some(Vec::new()),
        }
    }

    pub fn positionals(min: usize, max: Option<usize>) -> Self {
        Self {
            min_positionals: min,
            max_positionals: max,
            switches: Some(Vec::new()),
        }
    }

    pub fn with_switches(mut self, switches: &[&'static str]) -> Self {
        self.switches = Some(switches.to_vec());
        self
    }

    pub fn validate(&self, command: &str, args: &ParsedArgs) -> Result<(), ParseError> {
        if let Some(known) = &self.switches {
            if let Some(unknown) = args
                .switch_names()
                .find(|name| !known.iter().any(|k| k.eq_ignore_ascii_case(name)))
            {
                return Err(ParseError::UnknownSwitch {
                    command: command.to_string(),
                    switch: unknown.to_string(),
                });
            }
        }

        let got = args.positionals().len();
        let too_few = got < self.min_positionals;
        let too_many = self.max_positionals.is_some_and(|max| got > max);
        if too_few || too_many {
            return Err(ParseError::ArgumentCount {
                command: command.to_string(),
                expected: self.describe_count(),
                got,
            });
        }
        Ok(())
    }

    pub fn usage(&self) -> String {
        let mut parts = vec![self.describe_count()];
        if let Some(switches) = &self.switches {
            if !switches.is_empty() {
                let names: Vec<String> = switches.iter().map(|s| format!("/{}", s)).collect();
                parts.push(format!("switches {}", names.join(" ")));
            }
        }
        parts.join(", ")
    }

    fn describe_count(&self) -> String {
        match (self.min_positionals, self.max_positionals) {
            (0, Some(0)) => "no arguments".to_string(),
            (min, Some(max)) if min == max => format!("{} argument(s)", min),
            (min, Some(max)) => format!("{}-{} arguments", min, max),
            (0, None) => "any arguments".to_string(),
            (min, None) => format!("at least {} argument(s)", min),
        }
    }
}

/// Immutable description of a registered plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub name: CommandName,
    pub required_rank: RankLevel,
    pub version: Version,
    pub schema: ArgSchema,
    pub help: String,
    /// When false, lines invoking this command never stay in history.
    pub keep_history: bool,
}

impl PluginDescriptor {
    pub fn new(name: &str, required_rank: RankLevel) -> Result<Self, RegistryError> {
        Ok(Self {
            name: CommandName::new(name)?,
            required_rank,
            version: Version::new(1, 0, 0),
            schema: ArgSchema::any(),
            help: String::new(),
            keep_history: true,
        })
    }

    /// Descriptor for a compiled-in plugin. The name is checked when the
    /// descriptor is registered.
    pub fn builtin(name: &'static str, required_rank: RankLevel) -> Self {
        Self {
            name: CommandName(name.to_ascii_uppercase()),
            required_rank,
            version: Version::new(1, 0, 0),
            schema: ArgSchema::any(),
            help: String::new(),
            keep_history: true,
        }
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn schema(mut self, schema: ArgSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// For commands whose arguments are secrets.
    pub fn no_history(mut self) -> Self {
        self.keep_history = false;
        self
    }

    pub fn summary(&self) -> &str {
        self.help.lines().next().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationalState {
    #[default]
    None,
    Idle,
    Running,
    Complete,
    CompleteWithErrors,
    Cancelled,
    Incomplete,
    IncompleteWithErrors,
}

impl OperationalState {
    pub fn is_finished(self) -> bool {
        !matches!(
            self,
            OperationalState::None | OperationalState::Idle | OperationalState::Running
        )
    }

    pub fn is_success(self) -> bool {
        self == OperationalState::Complete
    }

    /// The same outcome once errors have been recorded against it.
    pub fn with_errors(self) -> Self {
        match self {
            OperationalState::Complete => OperationalState::CompleteWithErrors,
            OperationalState::Incomplete => OperationalState::IncompleteWithErrors,
            other => other,
        }
    }
}

/// A command handler. Each dispatch runs on a fresh instance from the
/// registry's factory.
pub trait Plugin: Send {
    fn descriptor() -> PluginDescriptor
    where
        Self: Sized;

    fn execute(
        &mut self,
        ctx: &mut PluginContext<'_>,
        cmd: &Command,
    ) -> Result<OperationalState, PluginError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub u64);

impl InstanceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        InstanceId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedError {
    pub at: DateTime<Local>,
    pub error: DispatchError,
}

/// One execution of a descriptor.
pub struct PluginInstance {
    id: InstanceId,
    descriptor: Arc<PluginDescriptor>,
    plugin: Box<dyn Plugin>,
    state: OperationalState,
    errors: Vec<LoggedError>,
    result: Option<SharedResult>,
}

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginInstance")
            .field("id", &self.id)
            .field("name", &self.descriptor.name)
            .field("state", &self.state)
            .field("errors", &self.errors.len())
            .finish()
    }
}

impl PluginInstance {
    pub fn new(descriptor: Arc<PluginDescriptor>, plugin: Box<dyn Plugin>) -> Self {
        Self {
            id: InstanceId::next(),
            descriptor,
            plugin,
            state: OperationalState::None,
            errors: Vec::new(),
            result: None,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> OperationalState {
        self.state
    }

    pub fn errors(&self) -> &[LoggedError] {
        &self.errors
    }

    pub fn result(&self) -> Option<&SharedResult> {
        self.result.as_ref()
    }

    pub fn take_result(&mut self) -> Option<SharedResult> {
        self.result.take()
    }

    pub fn record_error(&mut self, error: DispatchError) {
        self.errors.push(LoggedError {
            at: Local::now(),
            error,
        });
    }

    pub(crate) fn set_state(&mut self, state: OperationalState) {
        self.state = state;
    }

    /// Runs the plugin once; the caller decides how to treat panics.
    pub(crate) fn execute(
        &mut self,
        ctx: &mut PluginContext<'_>,
        cmd: &Command,
    ) -> Result<OperationalState, PluginError> {
        self.state = OperationalState::Running;
        let outcome = self.plugin.execute(ctx, cmd);
        self.result = ctx.result.take();
        outcome
    }
}

/// Everything a plugin may touch while it runs.
pub struct PluginContext<'a> {
    pub actor: &'a Actor,
    pub args: &'a ParsedArgs,
    pub cancel: &'a CancelToken,
    pub registry: &'a PluginRegistry,
    pub instance: InstanceId,
    console: &'a mut dyn Console,
    shell: &'a ShellState,
    warnings: Vec<String>,
    result: Option<SharedResult>,
}

impl<'a> PluginContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        actor: &'a Actor,
        args: &'a ParsedArgs,
        cancel: &'a CancelToken,
        registry: &'a PluginRegistry,
        instance: InstanceId,
        console: &'a mut dyn Console,
        shell: &'a ShellState,
    ) -> Self {
        Self {
            actor,
            args,
            cancel,
            registry,
            instance,
            console,
            shell,
            warnings: Vec::new(),
            result: None,
        }
    }

    pub fn print(&mut self, text: &str) -> Result<(), PluginError> {
        Ok(self.console.write_line(Tone::Normal, text)?)
    }

    pub fn print_tone(&mut self, tone: Tone, text: &str) -> Result<(), PluginError> {
        Ok(self.console.write_line(tone, text)?)
    }

    pub fn console(&mut self) -> &mut dyn Console {
        &mut *self.console
    }

    /// Fails with [`PluginError::Cancelled`] once cancellation was requested.
    pub fn checkpoint(&self) -> Result<(), PluginError> {
        if self.cancel.is_cancelled() {
            Err(PluginError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Records a non-fatal problem; the run finishes `...WithErrors`.
    pub fn warn(&mut self, message: impl Into<String>) -> Result<(), PluginError> {
        let message = message.into();
        self.console.write_line(Tone::Error, &message)?;
        self.warnings.push(message);
        Ok(())
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Offers a result to other plugins through the shared pool.
    pub fn publish(&mut self, value: impl Into<String>, ttl: Duration, max_reads: u32) {
        self.result = Some(SharedResult::new(value, ttl, max_reads));
    }

    pub fn results(&self) -> &ResultPool {
        self.shell.results()
    }

    pub fn shell(&self) -> &ShellState {
        self.shell
    }

    pub fn store(&self) -> PluginStore {
        self.shell.plugin_store()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_name_rules() {
        assert_eq!(CommandName::new("help").unwrap().as_str(), "HELP");
        assert!(CommandName::new("ADMIN_TOOL-2").is_ok());
        for bad in ["", "ABC", "1HELP", "HE LP", "HELP!", "_HELP"] {
            assert!(CommandName::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_schema_validation() {
        let schema = ArgSchema::positionals(1, Some(2)).with_switches(&["all"]);
        let ok = ParsedArgs::parse("/ALL one").unwrap();
        assert!(schema.validate("LIST", &ok).is_ok());

        let unknown = ParsedArgs::parse("/deep one").unwrap();
        assert!(matches!(
            schema.validate("LIST", &unknown),
            Err(ParseError::UnknownSwitch { .. })
        ));

        let none = ParsedArgs::parse("").unwrap();
        assert!(matches!(
            schema.validate("LIST", &none),
            Err(ParseError::ArgumentCount { got: 0, .. })
        ));

        let many = ParsedArgs::parse("a b c").unwrap();
        assert!(schema.validate("LIST", &many).is_err());
        assert!(ArgSchema::any().validate("LIST", &many).is_ok());
    }

    #[test]
    fn test_schema_usage() {
        assert_eq!(ArgSchema::none().usage(), "no arguments");
        assert_eq!(
            ArgSchema::positionals(1, Some(2))
                .with_switches(&["all"])
                .usage(),
            "1-2 arguments, switches /all"
        );
    }

    #[test]
    fn test_state_helpers() {
        assert!(!OperationalState::Running.is_finished());
        assert!(OperationalState::Cancelled.is_finished());
        assert_eq!(
            OperationalState::Complete.with_errors(),
            OperationalState::CompleteWithErrors
        );
        assert_eq!(
            OperationalState::Cancelled.with_errors(),
            OperationalState::Cancelled
        );
    }

    #[test]
    fn test_descriptor_builder() {
        let descriptor = PluginDescriptor::new("admintool", RankLevel::SuperUser)
            .unwrap()
            .version(Version::new(2, 1, 0))
            .help("Administer things.\nLonger text.");
        assert_eq!(descriptor.name.as_str(), "ADMINTOOL");
        assert_eq!(descriptor.summary(), "Administer things.");
        assert_eq!(descriptor.version, Version::new(2, 1, 0));
    }
}
