//! Wildcard patterns used for invalidation
//!
//! Only `*` is special (any sequence, including empty). Every other
//! character matches itself on every backend.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::domain::DomainError;

/// A validated invalidation pattern such as `"questions*"` or an exact key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPattern(String);

impl KeyPattern {
    pub fn new(pattern: impl Into<String>) -> Result<Self, DomainError> {
        let pattern = pattern.into();

        if pattern.is_empty() {
            return Err(DomainError::validation("Invalidation pattern must not be empty"));
        }

        Ok(Self(pattern))
    }

    /// Pattern matching every key
    pub fn all() -> Self {
        Self("*".to_string())
    }

    /// Pattern matching the prefix and every parameterised variant of it
    pub fn prefix(prefix: &str) -> Self {
        Self(format!("{}*", prefix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_exact(&self) -> bool {
        !self.0.contains('*')
    }

    /// Anchored regular expression source: metacharacters escaped, `*` as `.*`
    pub fn to_regex(&self) -> String {
        let body = self
            .0
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        format!("^{}$", body)
    }

    /// Redis `MATCH` glob with Redis-only specials escaped
    pub fn to_redis_glob(&self) -> String {
        let mut glob = String::with_capacity(self.0.len());

        for c in self.0.chars() {
            if matches!(c, '?' | '[' | ']' | '\\') {
                glob.push('\\');
            }
            glob.push(c);
        }

        glob
    }

    /// `*` also spans line breaks, as it does in Redis MATCH and PostgreSQL `~`
    pub fn compile(&self) -> Result<Regex, DomainError> {
        RegexBuilder::new(&self.to_regex())
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| DomainError::validation(format!("Invalid pattern '{}': {}", self.0, e)))
    }

    pub fn matches(&self, key: &str) -> bool {
        self.compile().map(|re| re.is_match(key)).unwrap_or(false)
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for KeyPattern {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
