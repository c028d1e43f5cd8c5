//! MIME content type value object.

use super::MessageDomainError;
use std::fmt;

/// Parsed `type/subtype` content type.
///
/// Parameters after `;` are dropped. Type and subtype are lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentType {
    main_type: String,
    subtype: String,
}

impl ContentType {
    /// Creates a content type from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDomainError::InvalidContentType`] when either part is
    /// empty or contains a `/`.
    pub fn new(
        main_type: impl Into<String>,
        subtype: impl Into<String>,
    ) -> Result<Self, MessageDomainError> {
        let normalized_type = main_type.into().trim().to_ascii_lowercase();
        let normalized_subtype = subtype.into().trim().to_ascii_lowercase();
        if normalized_type.is_empty()
            || normalized_subtype.is_empty()
            || normalized_type.contains('/')
            || normalized_subtype.contains('/')
        {
            return Err(MessageDomainError::InvalidContentType(format!(
                "{normalized_type}/{normalized_subtype}"
            )));
        }

        Ok(Self {
            main_type: normalized_type,
            subtype: normalized_subtype,
        })
    }

    /// Parses `type/subtype[;parameters]`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDomainError::InvalidContentType`] when the value has
    /// no `/` separator or an empty part.
    pub fn parse(value: &str) -> Result<Self, MessageDomainError> {
        let essence = value.split(';').next().unwrap_or_default();
        let (main_type, subtype) = essence
            .split_once('/')
            .ok_or_else(|| MessageDomainError::InvalidContentType(value.to_owned()))?;
        Self::new(main_type, subtype)
            .map_err(|_| MessageDomainError::InvalidContentType(value.to_owned()))
    }

    /// `application/octet-stream`.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::known("application", "octet-stream")
    }

    /// `text/plain`.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::known("text", "plain")
    }

    /// `application/json`.
    #[must_use]
    pub fn application_json() -> Self {
        Self::known("application", "json")
    }

    fn known(main_type: &str, subtype: &str) -> Self {
        Self {
            main_type: main_type.to_owned(),
            subtype: subtype.to_owned(),
        }
    }

    /// Returns the main type, for example `application`.
    #[must_use]
    pub fn main_type(&self) -> &str {
        &self.main_type
    }

    /// Returns the subtype, for example `vnd.demo.foo.v1+avro`.
    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Returns the structured-syntax suffix after the last `+`, if any.
    #[must_use]
    pub fn suffix(&self) -> Option<&str> {
        self.subtype
            .rsplit_once('+')
            .map(|(_, suffix)| suffix)
            .filter(|suffix| !suffix.is_empty())
    }

    /// Returns whether this content type contains a wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.main_type == "*" || self.subtype == "*" || self.subtype.starts_with("*+")
    }

    /// Returns whether this (possibly wildcard) type includes `other`.
    ///
    /// `*/*` includes everything; `application/*` includes every
    /// `application` type; `application/*+avro` includes every `application`
    /// subtype with the `avro` suffix.
    #[must_use]
    pub fn includes(&self, other: &Self) -> bool {
        if self.main_type == "*" {
            return true;
        }
        if self.main_type != other.main_type {
            return false;
        }
        if self.subtype == "*" || self.subtype == other.subtype {
            return true;
        }
        match self.subtype.strip_prefix("*+") {
            Some(suffix) => other.suffix() == Some(suffix) || other.subtype == suffix,
            None => false,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.main_type, self.subtype)
    }
}

impl TryFrom<&str> for ContentType {
    type Error = MessageDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
