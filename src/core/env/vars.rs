use std::borrow::Cow;
use std::collections::BTreeMap;

use super::EnvError;
use crate::core::actor::Actor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
    pub read_only: bool,
    pub owner: Actor,
}

/// Shell-local variables substituted into command text before resolution.
///
/// Names are case-insensitive. A read-only variable may only be rewritten
/// by its owner or by [`Actor::system`]; variables the system owns are
/// closed to everyone else.
#[derive(Clone, Debug, Default)]
pub struct EnvironmentTable {
    vars: BTreeMap<String, EnvironmentVariable>,
}

impl EnvironmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: &str, caller: &Actor) -> Result<(), EnvError> {
        self.write(name, value, caller, false)
    }

    pub fn set_read_only(&mut self, name: &str, value: &str, caller: &Actor) -> Result<(), EnvError> {
        self.write(name, value, caller, true)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(&Self::key(name))
            .map(|var| var.value.as_str())
    }

    pub fn variable(&self, name: &str) -> Option<&EnvironmentVariable> {
        self.vars.get(&Self::key(name))
    }

    pub fn remove(&mut self, name: &str, caller: &Actor) -> Result<(), EnvError> {
        let key = Self::key(name);
        let var = self
            .vars
            .get(&key)
            .ok_or_else(|| EnvError::VarNotFound(name.to_string()))?;
        Self::check_write(var, caller)?;
        self.vars.remove(&key);
        Ok(())
    }

    /// True when the variable holds an affirmative value (`on`, `1`, `true`, `yes`).
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(|value| {
            matches!(
                value.to_ascii_lowercase().as_str(),
                "on" | "1" | "true" | "yes"
            )
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvironmentVariable> {
        self.vars.values()
    }

    /// Substitutes `$NAME` and `$[NAME]` placeholders.
    ///
    /// `$$` yields a literal `$`, unknown names are left as written and
    /// nothing between single quotes is touched.
    pub fn expand<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if !text.contains('$') {
            return Cow::Borrowed(text);
        }

        let mut result = String::with_capacity(text.len());
        let mut in_single = false;
        let mut rest = text;

        while let Some(c) = rest.chars().next() {
            if c == '\'' {
                in_single = !in_single;
            }
            if c != '$' || in_single {
                result.push(c);
                rest = &rest[c.len_utf8()..];
                continue;
            }

            let after = &rest[1..];
            if let Some(stripped) = after.strip_prefix('$') {
                result.push('$');
                rest = stripped;
            } else if let Some(bracketed) = after.strip_prefix('[') {
                match bracketed.find(']') {
                    Some(end) => {
                        let name = &bracketed[..end];
                        match self.get(name) {
                            Some(value) => result.push_str(value),
                            None => result.push_str(&rest[..end + 3]),
                        }
                        rest = &bracketed[end + 1..];
                    }
                    None => {
                        result.push_str(rest);
                        rest = "";
                    }
                }
            } else {
                let end = after
                    .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                    .unwrap_or(after.len());
                let name = &after[..end];
                match self.get(name).filter(|_| !name.is_empty()) {
                    Some(value) => result.push_str(value),
                    None => result.push_str(&rest[..end + 1]),
                }
                rest = &after[end..];
            }
        }

        Cow::Owned(result)
    }

    fn write(
        &mut self,
        name: &str,
        value: &str,
        caller: &Actor,
        read_only: bool,
    ) -> Result<(), EnvError> {
        Self::validate_name(name)?;
        let key = Self::key(name);

        if let Some(existing) = self.vars.get_mut(&key) {
            Self::check_write(existing, caller)?;
            existing.value = value.to_string();
            if !existing.read_only {
                existing.owner = caller.clone();
            }
            existing.read_only |= read_only;
            return Ok(());
        }

        self.vars.insert(
            key.clone(),
            EnvironmentVariable {
                name: key,
                value: value.to_string(),
                read_only,
                owner: caller.clone(),
            },
        );
        Ok(())
    }

    fn check_write(var: &EnvironmentVariable, caller: &Actor) -> Result<(), EnvError> {
        let owner = &var.owner;
        let is_owner = !owner.is_system() && caller.name().eq_ignore_ascii_case(owner.name());
        if var.read_only && !caller.is_system() && !is_owner {
            return Err(EnvError::ReadOnly {
                name: var.name.clone(),
                owner: owner.name().to_string(),
            });
        }
        Ok(())
    }

    fn validate_name(name: &str) -> Result<(), EnvError> {
        let mut chars = name.chars();
        let valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(())
        } else {
            Err(EnvError::InvalidName(name.to_string()))
        }
    }

    fn key(name: &str) -> String {
        name.to_ascii_uppercase()
    }
}
