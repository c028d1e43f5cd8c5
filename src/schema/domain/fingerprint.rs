//! Content fingerprints for schema identity.

use apache_avro::Schema;
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 digest of a schema's Parsing Canonical Form.
///
/// Two schemas with equal fingerprints are the same schema for registration
/// purposes, regardless of whitespace, field attribute order or documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaFingerprint([u8; 32]);

impl SchemaFingerprint {
    /// Computes the fingerprint of `schema`.
    #[must_use]
    pub fn of(schema: &Schema) -> Self {
        Self(Sha256::digest(schema.canonical_form().as_bytes()).into())
    }

    /// Returns the raw digest.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for SchemaFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatting_differences_share_a_fingerprint() {
        let compact = Schema::parse_str(
            r#"{"type":"record","name":"Foo","namespace":"demo","fields":[{"name":"foo","type":"string"}]}"#,
        )
        .expect("valid schema");
        let documented = Schema::parse_str(
            r#"{
                "namespace": "demo",
                "type": "record",
                "name": "Foo",
                "doc": "a documented record",
                "fields": [ { "name": "foo", "type": "string" } ]
            }"#,
        )
        .expect("valid schema");

        assert_eq!(SchemaFingerprint::of(&compact), SchemaFingerprint::of(&documented));
        assert_eq!(SchemaFingerprint::of(&compact).to_string().len(), 64);
    }
}
