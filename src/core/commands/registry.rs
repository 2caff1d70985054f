use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{
    AliasCommand, CommandName, HelpCommand, HistoryCommand, LoginCommand, Plugin,
    PluginDescriptor, PluginInstance, PrintCommand, SettingsCommand, SourceCommand,
    UnaliasCommand, WaitCommand,
};
use crate::core::config::AliasTable;
use crate::core::rank::RankLevel;

pub type PluginFactory = Arc<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// Descriptors visible at one moment, handed to heartbeat subscribers.
pub type RegistrySnapshot = Vec<Arc<PluginDescriptor>>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid command name {0:?}: a letter then at least 3 of A-Z 0-9 _ -")]
    InvalidName(String),
    #[error("command {0} is already registered")]
    Duplicate(String),
}

struct Entry {
    descriptor: Arc<PluginDescriptor>,
    factory: PluginFactory,
}

/// Command name to `(descriptor, factory)` table, filled at startup.
#[derive(Default)]
pub struct PluginRegistry {
    entries: BTreeMap<String, Entry>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every compiled-in plugin.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register_plugin::<HelpCommand>()?;
        registry.register_plugin::<PrintCommand>()?;
        registry.register_plugin::<LoginCommand>()?;
        registry.register_plugin::<HistoryCommand>()?;
        registry.register_plugin::<AliasCommand>()?;
        registry.register_plugin::<UnaliasCommand>()?;
        registry.register_plugin::<SourceCommand>()?;
        registry.register_plugin::<SettingsCommand>()?;
        registry.register_plugin::<WaitCommand>()?;
        Ok(registry)
    }

    pub fn register(
        &mut self,
        descriptor: PluginDescriptor,
        factory: PluginFactory,
    ) -> Result<(), RegistryError> {
        let name = CommandName::new(descriptor.name.as_str())?;
        if self.entries.contains_key(name.as_str()) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }

        debug!(
            command = name.as_str(),
            rank = %descriptor.required_rank,
            version = %descriptor.version,
            "registered plugin"
        );
        let descriptor = PluginDescriptor { name, ..descriptor };
        self.entries.insert(
            descriptor.name.to_string(),
            Entry {
                descriptor: Arc::new(descriptor),
                factory,
            },
        );
        Ok(())
    }

    pub fn register_plugin<P>(&mut self) -> Result<(), RegistryError>
    where
        P: Plugin + Default + 'static,
    {
        self.register(P::descriptor(), Arc::new(|| Box::new(P::default()) as Box<dyn Plugin>))
    }

    /// Exact, case-insensitive lookup.
    pub fn lookup(&self, name: &str) -> Option<&Arc<PluginDescriptor>> {
        self.entries
            .get(&name.to_ascii_uppercase())
            .map(|entry| &entry.descriptor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Whether a line starting with `text` may be kept in history.
    ///
    /// Follows aliases to the plugin they end at, so an alias of `LOGIN`
    /// is as private as `LOGIN` itself.
    pub fn keeps_history(&self, text: &str, aliases: &AliasTable) -> bool {
        let mut verb = text.split_whitespace().next().unwrap_or("");
        for _ in 0..=aliases.len() {
            if let Some(descriptor) = self.lookup(verb) {
                return descriptor.keep_history;
            }
            match aliases.get(verb).and_then(|e| e.split_whitespace().next()) {
                Some(next) => verb = next,
                None => return true,
            }
        }
        true
    }

    /// A fresh instance of `name`, in state `None`.
    pub fn instantiate(&self, name: &str) -> Option<PluginInstance> {
        let entry = self.entries.get(&name.to_ascii_uppercase())?;
        Some(PluginInstance::new(
            Arc::clone(&entry.descriptor),
            (entry.factory)(),
        ))
    }

    /// Descriptors an actor of `rank` may see, ordered by name.
    pub fn visible_to(&self, rank: RankLevel) -> Vec<Arc<PluginDescriptor>> {
        self.entries
            .values()
            .filter(|entry| rank.satisfies(entry.descriptor.required_rank))
            .map(|entry| Arc::clone(&entry.descriptor))
            .collect()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.entries
            .values()
            .map(|entry| Arc::clone(&entry.descriptor))
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
