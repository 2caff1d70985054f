use std::{fs, path::Path};

use tracing::debug;

use super::{aliases::strip_quotes, ConfigError, ConfigPaths, ShellConfig};
use crate::core::actor::Actor;

pub struct ConfigLoader<'a> {
    paths: &'a ConfigPaths,
}

impl<'a> ConfigLoader<'a> {
    pub fn new(paths: &'a ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn load_configs(&self, config: &mut ShellConfig) -> Result<(), ConfigError> {
        for path in self.paths.files() {
            if path.exists() {
                self.load_file(path, config)?;
            } else if self.paths.is_required() {
                return Err(ConfigError::ConfigFileNotFound(path.to_path_buf()));
            }
        }
        Ok(())
    }

    pub fn load_file(&self, path: &Path, config: &mut ShellConfig) -> Result<(), ConfigError> {
        debug!(path = %path.display(), "loading rc file");
        let content = fs::read_to_string(path)?;
        for (index, line) in content.lines().enumerate() {
            self.process_line(line, config)
                .map_err(|e| ConfigError::InvalidLine {
                    path: path.display().to_string(),
                    line: index + 1,
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }

    fn process_line(&self, line: &str, config: &mut ShellConfig) -> Result<(), ConfigError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        let (keyword, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let (name, value) = rest.split_once('=').ok_or_else(|| {
            ConfigError::Malformed(format!("expected {} NAME=VALUE", keyword))
        })?;
        let name = name.trim();
        let value = strip_quotes(value.trim());

        match keyword {
            "set" => config.set(name, value),
            "alias" => Ok(config.aliases.define(name, value)?),
            "export" => {
                let expanded = config.environment.expand(value).into_owned();
                Ok(config.environment.set(name, &expanded, &Actor::system())?)
            }
            "readonly" => {
                let expanded = config.environment.expand(value).into_owned();
                Ok(config
                    .environment
                    .set_read_only(name, &expanded, &Actor::system())?)
            }
            other => Err(ConfigError::UnknownSetting(other.to_string())),
        }
    }
}
