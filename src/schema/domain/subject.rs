//! Validated registry subject.

use super::SchemaDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry namespace for a family of schema versions.
///
/// Subjects are conventionally the lower-cased fully qualified name of the
/// schema, for example `demo.foo`. They must be usable inside a content type,
/// so only ASCII letters, digits, `.`, `_`, `-` and `$` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Subject(String);

impl Subject {
    /// Creates a validated subject.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaDomainError::EmptySubject`] when the value is blank and
    /// [`SchemaDomainError::InvalidSubject`] when it contains other characters
    /// than ASCII alphanumerics, `.`, `_`, `-` or `$`.
    pub fn new(value: impl Into<String>) -> Result<Self, SchemaDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SchemaDomainError::EmptySubject);
        }
        let is_valid = trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '$'));
        if !is_valid {
            return Err(SchemaDomainError::InvalidSubject(raw));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the subject as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Subject {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Subject {
    type Error = SchemaDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Subject {
    type Error = SchemaDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Subject> for String {
    fn from(value: Subject) -> Self {
        value.0
    }
}
