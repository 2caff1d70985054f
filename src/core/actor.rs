use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::rank::RankLevel;

/// The identity a command runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    name: Arc<str>,
    rank: RankLevel,
    system: bool,
}

impl Actor {
    pub fn new(name: impl Into<Arc<str>>, rank: RankLevel) -> Self {
        Self {
            name: name.into(),
            rank,
            system: false,
        }
    }

    /// The built-in identity used for rc files and internal bookkeeping.
    /// No actor built with [`Actor::new`] compares equal to it, whatever
    /// its name.
    pub fn system() -> Self {
        Self {
            name: super::env::SYSTEM_OWNER.into(),
            rank: RankLevel::SuperUser,
            system: true,
        }
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rank(&self) -> RankLevel {
        self.rank
    }

    pub fn with_rank(&self, rank: RankLevel) -> Self {
        Self {
            name: Arc::clone(&self.name),
            rank,
            system: self.system,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.rank)
    }
}

/// Credential check collaborator consulted by `LOGIN`.
pub trait Directory: Send + Sync {
    /// Returns the actor for `name` when `secret` is accepted.
    fn authenticate(&self, name: &str, secret: &str) -> Option<Actor>;
}

/// A fixed in-memory directory, handy for hosts without a credential store.
#[derive(Debug, Default, Clone)]
pub struct StaticDirectory {
    entries: HashMap<String, (String, RankLevel)>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, name: &str, secret: &str, rank: RankLevel) -> Self {
        self.entries
            .insert(name.to_lowercase(), (secret.to_string(), rank));
        self
    }
}

impl Directory for StaticDirectory {
    fn authenticate(&self, name: &str, secret: &str) -> Option<Actor> {
        self.entries
            .get(&name.to_lowercase())
            .filter(|(stored, _)| stored == secret)
            .map(|(_, rank)| Actor::new(name, *rank))
    }
}
