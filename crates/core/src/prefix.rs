use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefixError {
    #[error("directory prefix is empty")]
    Empty,
    #[error("directory prefix '{0}' contains an empty segment")]
    EmptySegment(String),
}

/// A virtual directory in the flat key namespace, e.g. `backups/postgres`.
///
/// Stored without leading or trailing `/`. Every key strictly below the
/// directory starts with `"<prefix>/"`; the key `"<prefix>/"` itself is
/// treated as a directory marker and never as a child.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Prefix(String);

impl Prefix {
    pub fn parse(raw: &str) -> Result<Self, PrefixError> {
        let trimmed = raw.strip_prefix('/').unwrap_or(raw);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(PrefixError::Empty);
        }
        if trimmed.split('/').any(str::is_empty) {
            return Err(PrefixError::EmptySegment(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The listing prefix including the trailing delimiter.
    pub fn marker(&self) -> String {
        format!("{}/", self.0)
    }

    /// Full key of an object named `name` inside this directory.
    pub fn key_for(&self, name: &str) -> String {
        format!("{}/{name}", self.0)
    }

    pub fn child(&self, name: &str) -> Result<Self, PrefixError> {
        Self::parse(&self.key_for(name))
    }

    /// Part of `key` below this directory, or `None` if the key lies
    /// elsewhere or is the directory marker itself.
    pub fn relative<'k>(&self, key: &'k str) -> Option<&'k str> {
        let rest = key.strip_prefix(self.0.as_str())?.strip_prefix('/')?;
        (!rest.is_empty()).then_some(rest)
    }

    /// Name of `key` if it sits exactly one segment below this directory.
    pub fn immediate_child<'k>(&self, key: &'k str) -> Option<&'k str> {
        self.relative(key).filter(|rest| !rest.contains('/'))
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Prefix {
    type Err = PrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
