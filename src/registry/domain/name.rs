//! Validated binder name type.

use super::RegistryDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a binder configuration or binder type (e.g. `memory`,
/// `kafka-eu`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BinderName(String);

impl BinderName {
    /// Creates a validated binder name.
    ///
    /// The input is trimmed. Only ASCII alphanumerics, `.`, `_` and `-` are
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryDomainError::EmptyBinderName`] when the value is
    /// empty after trimming or [`RegistryDomainError::InvalidBinderName`]
    /// when it contains other characters.
    pub fn new(value: impl AsRef<str>) -> Result<Self, RegistryDomainError> {
        let raw = value.as_ref();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RegistryDomainError::EmptyBinderName);
        }
        let is_valid = trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !is_valid {
            return Err(RegistryDomainError::InvalidBinderName(raw.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Parses an optional binder name; absent or blank means "default".
    ///
    /// # Errors
    ///
    /// Returns [`RegistryDomainError::InvalidBinderName`] for a non-blank
    /// name with invalid characters.
    pub fn optional(value: Option<&str>) -> Result<Option<Self>, RegistryDomainError> {
        match value.map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) => Self::new(name).map(Some),
        }
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for BinderName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for BinderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BinderName {
    type Error = RegistryDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BinderName> for String {
    fn from(value: BinderName) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("memory", "memory")]
    #[case("  kafka-eu ", "kafka-eu")]
    #[case("rabbit.v2_local", "rabbit.v2_local")]
    fn accepts_valid_names(#[case] input: &str, #[case] expected: &str) {
        let name = BinderName::new(input).expect("valid name");
        assert_eq!(name.as_str(), expected);
    }

    #[rstest]
    #[case("", RegistryDomainError::EmptyBinderName)]
    #[case("   ", RegistryDomainError::EmptyBinderName)]
    #[case("my binder", RegistryDomainError::InvalidBinderName("my binder".to_owned()))]
    #[case("a=b", RegistryDomainError::InvalidBinderName("a=b".to_owned()))]
    fn rejects_invalid_names(#[case] input: &str, #[case] expected: RegistryDomainError) {
        assert_eq!(BinderName::new(input), Err(expected));
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("  "))]
    fn blank_optional_name_means_default(#[case] input: Option<&str>) {
        assert_eq!(BinderName::optional(input), Ok(None));
    }
}
