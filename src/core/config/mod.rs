use std::path::PathBuf;
use std::time::Duration;

pub mod aliases;
mod loader;
mod paths;

pub use aliases::{AliasError, AliasTable};
pub use loader::ConfigLoader;
pub use paths::ConfigPaths;

use super::env::{EnvError, EnvironmentTable};
use super::queue::{DEFAULT_CACHE_LIMIT, MIN_CACHE_LIMIT};
use super::rank::RankLevel;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("home directory not found")]
    HomeDirNotFound,
    #[error("config file not found: {}", .0.display())]
    ConfigFileNotFound(PathBuf),
    #[error("{path}:{line}: {message}")]
    InvalidLine {
        path: String,
        line: usize,
        message: String,
    },
    #[error("{0}")]
    Malformed(String),
    #[error("unknown setting: {0}")]
    UnknownSetting(String),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Alias(#[from] AliasError),
    #[error(transparent)]
    Env(#[from] EnvError),
}

/// Everything the shell reads from its rc files before the loops start.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub cache_limit: usize,
    pub heartbeat: Duration,
    pub prompt: String,
    pub catch_errors: bool,
    pub require_auth: bool,
    pub default_rank: RankLevel,
    pub echo: bool,
    pub aliases: AliasTable,
    pub environment: EnvironmentTable,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            cache_limit: DEFAULT_CACHE_LIMIT,
            heartbeat: Duration::ZERO,
            prompt: "> ".to_string(),
            catch_errors: true,
            require_auth: false,
            default_rank: RankLevel::BasicUser,
            echo: false,
            aliases: AliasTable::new(),
            environment: EnvironmentTable::new(),
        }
    }
}

impl ShellConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one `key=value` setting.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = aliases::strip_quotes(value.trim());
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key.trim().to_ascii_lowercase().as_str() {
            "cache_limit" => {
                let limit: usize = value.parse().map_err(|_| invalid())?;
                self.cache_limit = limit.max(MIN_CACHE_LIMIT);
            }
            "heartbeat" => {
                let secs: u64 = value.parse().map_err(|_| invalid())?;
                self.heartbeat = Duration::from_secs(secs);
            }
            "prompt" => self.prompt = value.to_string(),
            "catch_errors" => self.catch_errors = parse_bool(value).ok_or_else(invalid)?,
            "require_auth" => self.require_auth = parse_bool(value).ok_or_else(invalid)?,
            "echo" => self.echo = parse_bool(value).ok_or_else(invalid)?,
            "default_rank" => self.default_rank = value.parse().map_err(|_| invalid())?,
            other => return Err(ConfigError::UnknownSetting(other.to_string())),
        }
        Ok(())
    }

    pub fn load(&mut self, paths: &ConfigPaths) -> Result<(), ConfigError> {
        ConfigLoader::new(paths).load_configs(self)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ShellConfig::new();
        assert_eq!(config.cache_limit, 25);
        assert_eq!(config.heartbeat, Duration::ZERO);
        assert!(config.catch_errors);
        assert_eq!(config.default_rank, RankLevel::BasicUser);
    }

    #[test]
    fn test_set_values() {
        let mut config = ShellConfig::new();
        config.set("cache_limit", "2").unwrap();
        assert_eq!(config.cache_limit, MIN_CACHE_LIMIT);
        config.set("heartbeat", "30").unwrap();
        assert_eq!(config.heartbeat, Duration::from_secs(30));
        config.set("prompt", "'conch> '").unwrap();
        assert_eq!(config.prompt, "conch> ");
        config.set("CATCH_ERRORS", "off").unwrap();
        assert!(!config.catch_errors);
        config.set("default_rank", "poweruser").unwrap();
        assert_eq!(config.default_rank, RankLevel::PowerUser);
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut config = ShellConfig::new();
        assert!(matches!(
            config.set("cache_limit", "many"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set("colour", "red"),
            Err(ConfigError::UnknownSetting(_))
        ));
    }
}
