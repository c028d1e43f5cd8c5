//! Schema services: the caching registry decorator and the Avro codec.

mod caching;
mod codec;
mod error;
mod inference;
mod record;

pub use caching::CachingSchemaRegistryClient;
pub use codec::{AvroCodecConfig, AvroSchemaCodec, EncodedPayload};
pub use error::{SchemaCodecError, SchemaCodecResult};
pub use record::{GenericRecord, SelfDescribing};
