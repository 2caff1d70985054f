use std::borrow::Cow;
use std::collections::BTreeMap;

pub const MAX_ALIAS_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AliasError {
    #[error("invalid alias name {0:?}: use 1-{MAX_ALIAS_LEN} letters or digits")]
    InvalidName(String),
    #[error("alias {0} has an empty expansion")]
    EmptyExpansion(String),
    #[error("alias {0} expands to itself")]
    SelfReference(String),
    #[error("no such alias: {0}")]
    NotFound(String),
}

/// Short names that rewrite the verb of a command.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: BTreeMap<Box<str>, Box<str>>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `name -> expansion`; surrounding quotes on the expansion are dropped.
    pub fn define(&mut self, name: &str, expansion: &str) -> Result<(), AliasError> {
        if name.is_empty()
            || name.len() > MAX_ALIAS_LEN
            || !name.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(AliasError::InvalidName(name.to_string()));
        }

        let expansion = strip_quotes(expansion.trim());
        let first = expansion.split_whitespace().next().unwrap_or("");
        if first.is_empty() {
            return Err(AliasError::EmptyExpansion(name.to_string()));
        }
        if first.eq_ignore_ascii_case(name) {
            return Err(AliasError::SelfReference(name.to_string()));
        }

        self.aliases
            .insert(name.to_ascii_lowercase().into(), expansion.into());
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<(), AliasError> {
        self.aliases
            .remove(name.to_ascii_lowercase().as_str())
            .map(|_| ())
            .ok_or_else(|| AliasError::NotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.aliases
            .get(name.to_ascii_lowercase().as_str())
            .map(|s| &**s)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The expansion of `verb` followed by `payload`, if `verb` is an alias.
    pub fn resolve(&self, verb: &str, payload: &str) -> Option<String> {
        let expansion = self.get(verb)?;
        if payload.is_empty() {
            Some(expansion.to_string())
        } else {
            Some(format!("{} {}", expansion, payload))
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(|k| &**k)
    }

    pub fn get_all(&self) -> BTreeMap<Cow<'_, str>, Cow<'_, str>> {
        self.aliases
            .iter()
            .map(|(k, v)| (Cow::Borrowed(&**k), Cow::Borrowed(&**v)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

pub(crate) fn strip_quotes(value: &str) -> &str {
    let quoted = value.len() >= 2
        && ((value.starts_with('\'') && value.ends_with('\''))
            || (value.starts_with('"') && value.ends_with('"')));
    if quoted {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
