//! Domain model for schema references and registrations.

mod error;
mod fingerprint;
mod reference;
mod registration;
mod subject;

pub use error::SchemaDomainError;
pub use fingerprint::SchemaFingerprint;
pub use reference::{AVRO_FORMAT, SchemaReference};
pub use registration::SchemaRegistration;
pub use subject::Subject;
