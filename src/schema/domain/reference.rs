//! Schema reference value object and its content-type form.

use super::{SchemaDomainError, Subject};
use crate::message::domain::{ContentType, MessageDomainError};
use std::fmt;

/// Format tag for Avro schemas.
pub const AVRO_FORMAT: &str = "avro";

/// Identifies exactly one immutable schema: subject, version and format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaReference {
    subject: Subject,
    version: u32,
    format: String,
}

impl SchemaReference {
    /// Creates a schema reference.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaDomainError::InvalidVersion`] when `version` is zero
    /// and [`SchemaDomainError::EmptyFormat`] when the format is blank.
    pub fn new(
        subject: Subject,
        version: u32,
        format: impl Into<String>,
    ) -> Result<Self, SchemaDomainError> {
        if version == 0 {
            return Err(SchemaDomainError::InvalidVersion(version));
        }
        let normalized_format = format.into().trim().to_ascii_lowercase();
        if normalized_format.is_empty() {
            return Err(SchemaDomainError::EmptyFormat);
        }
        Ok(Self {
            subject,
            version,
            format: normalized_format,
        })
    }

    /// Creates an Avro schema reference.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaDomainError::InvalidVersion`] when `version` is zero.
    pub fn avro(subject: Subject, version: u32) -> Result<Self, SchemaDomainError> {
        Self::new(subject, version, AVRO_FORMAT)
    }

    /// Returns the subject.
    #[must_use]
    pub const fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Returns the version, starting at 1.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Returns the format tag, for example `avro`.
    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Renders `application/vnd.<subject>.v<version>+<format>`.
    ///
    /// # Errors
    ///
    /// Returns the content-type parse error when the subject cannot be
    /// represented, which validated subjects never trigger.
    pub fn to_content_type(&self) -> Result<ContentType, MessageDomainError> {
        ContentType::new(
            "application",
            format!("vnd.{}.v{}+{}", self.subject, self.version, self.format),
        )
    }

    /// Extracts a reference from `application/vnd.<subject>.v<version>+<format>`.
    ///
    /// Returns `None` for content types that do not name a concrete reference,
    /// such as `application/avro` or `application/*+avro`.
    #[must_use]
    pub fn from_content_type(content_type: &ContentType) -> Option<Self> {
        if content_type.main_type() != "application" {
            return None;
        }
        let (named, format) = content_type.subtype().rsplit_once('+')?;
        let (subject, version) = named.strip_prefix("vnd.")?.rsplit_once(".v")?;
        if version.is_empty() || !version.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let parsed_version = version.parse::<u32>().ok()?;
        let parsed_subject = Subject::new(subject).ok()?;
        Self::new(parsed_subject, parsed_version, format).ok()
    }
}

impl fmt::Display for SchemaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/v{}", self.subject, self.format, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn reference(subject: &str, version: u32) -> SchemaReference {
        SchemaReference::avro(Subject::new(subject).expect("valid subject"), version)
            .expect("valid reference")
    }

    #[test]
    fn renders_versioned_content_type() {
        let content_type = reference("demo.foo", 1)
            .to_content_type()
            .expect("content type");
        assert_eq!(content_type.to_string(), "application/vnd.demo.foo.v1+avro");
    }

    #[rstest]
    #[case("application/vnd.demo.foo.v1+avro", Some(("demo.foo", 1)))]
    #[case("application/vnd.demo.vehicle.v12+avro", Some(("demo.vehicle", 12)))]
    #[case("application/avro", None)]
    #[case("application/*+avro", None)]
    #[case("application/vnd.demo.foo+avro", None)]
    #[case("application/vnd.demo.foo.vx+avro", None)]
    #[case("text/vnd.demo.foo.v1+avro", None)]
    fn parses_reference_from_content_type(
        #[case] raw: &str,
        #[case] expected: Option<(&str, u32)>,
    ) {
        let content_type = ContentType::parse(raw).expect("valid content type");
        let parsed = SchemaReference::from_content_type(&content_type);
        assert_eq!(
            parsed,
            expected.map(|(subject, version)| reference(subject, version))
        );
    }

    #[test]
    fn rejects_version_zero() {
        let subject = Subject::new("demo.foo").expect("valid subject");
        assert_eq!(
            SchemaReference::avro(subject, 0),
            Err(SchemaDomainError::InvalidVersion(0))
        );
    }
}
