//! Interface to the hierarchical configuration store.
//!
//! The real store (encryption, backup, on-disk format) lives outside the
//! shell. Plugins only ever see it through [`PluginStore`], which keeps the
//! `system` hive read-only.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hive {
    System,
    App,
    User,
}

impl Hive {
    pub fn name(self) -> &'static str {
        match self {
            Hive::System => "system",
            Hive::App => "app",
            Hive::User => "user",
        }
    }
}

impl fmt::Display for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Hive {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(Hive::System),
            "app" => Ok(Hive::App),
            "user" => Ok(Hive::User),
            _ => Err(StoreError::UnknownHive(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("unknown hive: {0}")]
    UnknownHive(String),
    #[error("hive {0} is read-only")]
    ReadOnlyHive(Hive),
    #[error("invalid key path: {0:?}")]
    InvalidPath(String),
}

pub trait ConfigStore: Send + Sync {
    fn get(&self, hive: Hive, path: &str) -> Option<String>;
    fn set(&self, hive: Hive, path: &str, value: &str) -> Result<(), StoreError>;
}

/// Store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    hives: RwLock<BTreeMap<(Hive, String), String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, hive: Hive, path: &str) -> Option<String> {
        let hives = self.hives.read().unwrap_or_else(|e| e.into_inner());
        hives.get(&(hive, path.to_ascii_lowercase())).cloned()
    }

    fn set(&self, hive: Hive, path: &str, value: &str) -> Result<(), StoreError> {
        validate_path(path)?;
        let mut hives = self.hives.write().unwrap_or_else(|e| e.into_inner());
        hives.insert((hive, path.to_ascii_lowercase()), value.to_string());
        Ok(())
    }
}

/// The view of a store handed to plugins.
#[derive(Clone)]
pub struct PluginStore {
    inner: Arc<dyn ConfigStore>,
}

impl PluginStore {
    pub fn new(inner: Arc<dyn ConfigStore>) -> Self {
        Self { inner }
    }

    pub fn get(&self, hive: Hive, path: &str) -> Option<String> {
        self.inner.get(hive, path)
    }

    pub fn set(&self, hive: Hive, path: &str, value: &str) -> Result<(), StoreError> {
        if hive == Hive::System {
            return Err(StoreError::ReadOnlyHive(hive));
        }
        self.inner.set(hive, path, value)
    }
}

fn validate_path(path: &str) -> Result<(), StoreError> {
    let valid = !path.is_empty()
        && path.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        });
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidPath(path.to_string()))
    }
}
