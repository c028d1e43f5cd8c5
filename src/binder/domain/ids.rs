//! Identifier and validated-name types for bindings.

use super::BinderDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingId(Uuid);

impl BindingId {
    /// Creates a new random binding identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a binding identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for BindingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

fn has_forbidden_chars(value: &str) -> bool {
    value
        .chars()
        .any(|character| character.is_whitespace() || character.is_control())
}

/// Validated transport destination name such as a topic or queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DestinationName(String);

impl DestinationName {
    /// Creates a validated destination name.
    ///
    /// # Errors
    ///
    /// Returns [`BinderDomainError::EmptyDestination`] when the trimmed name
    /// is empty, or [`BinderDomainError::InvalidDestination`] when it contains
    /// whitespace or control characters.
    pub fn new(value: impl AsRef<str>) -> Result<Self, BinderDomainError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(BinderDomainError::EmptyDestination);
        }
        if has_forbidden_chars(trimmed) {
            return Err(BinderDomainError::InvalidDestination(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the destination name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DestinationName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestinationName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl TryFrom<String> for DestinationName {
    type Error = BinderDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DestinationName> for String {
    fn from(value: DestinationName) -> Self {
        value.0
    }
}

/// Named consumer group sharing one competing subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumerGroup(String);

impl ConsumerGroup {
    /// Resolves an optional group name.
    ///
    /// Absent and blank names both mean an anonymous consumer and yield
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns [`BinderDomainError::InvalidGroup`] when the trimmed name
    /// contains whitespace or control characters.
    pub fn optional(value: Option<&str>) -> Result<Option<Self>, BinderDomainError> {
        let Some(trimmed) = value.map(str::trim).filter(|name| !name.is_empty()) else {
            return Ok(None);
        };
        if has_forbidden_chars(trimmed) {
            return Err(BinderDomainError::InvalidGroup(trimmed.to_owned()));
        }
        Ok(Some(Self(trimmed.to_owned())))
    }

    /// Returns the group name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsumerGroup {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}
