//! Schema-aware Avro payload codec.

use super::inference::{infer_record_schema, type_full_name};
use super::{SchemaCodecError, SchemaCodecResult, SelfDescribing};
use crate::message::domain::{ContentType, Message, Payload};
use crate::schema::{
    domain::{SchemaReference, Subject},
    ports::{SchemaRegistryClient, SchemaRegistryError},
};
use apache_avro::{Schema, from_avro_datum, to_avro_datum, types::Value};
use bytes::Bytes;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

const SCHEMA_FILE_SUFFIX: &str = ".avsc";

/// Codec configuration.
#[derive(Debug, Clone, Default)]
pub struct AvroCodecConfig {
    /// Infer and register schemas for payload types with no known schema.
    pub dynamic_schema_generation_enabled: bool,
    /// Reader schema applied on decode; the writer schema is used when unset.
    pub reader_schema: Option<Schema>,
    /// Directory of `.avsc` files registered by [`AvroSchemaCodec::initialize`].
    pub schema_locations: Option<Utf8PathBuf>,
}

impl AvroCodecConfig {
    /// Enables or disables dynamic schema generation.
    #[must_use]
    pub const fn with_dynamic_schema_generation(mut self, enabled: bool) -> Self {
        self.dynamic_schema_generation_enabled = enabled;
        self
    }

    /// Sets the reader schema used for decoding.
    #[must_use]
    pub fn with_reader_schema(mut self, schema: Schema) -> Self {
        self.reader_schema = Some(schema);
        self
    }

    /// Sets the schema file directory.
    #[must_use]
    pub fn with_schema_locations(mut self, directory: impl Into<Utf8PathBuf>) -> Self {
        self.schema_locations = Some(directory.into());
        self
    }
}

/// Avro bytes plus the content type naming their writer schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    /// Avro binary datum.
    pub bytes: Bytes,
    /// `application/vnd.<subject>.v<version>+avro`.
    pub content_type: ContentType,
}

impl EncodedPayload {
    /// Wraps the payload in a message carrying its content type.
    #[must_use]
    pub fn into_message(self) -> Message {
        Message::new(self.bytes).with_content_type(&self.content_type)
    }
}

/// Encodes payloads to Avro and back, resolving schemas through a registry.
///
/// Encoding picks the writer schema in this order: the reference named by
/// the requested content type, the payload's own schema for
/// [`SelfDescribing`] payloads, the local schema known for the payload type,
/// and finally, when enabled, a schema inferred from the payload's shape.
/// The chosen schema is registered and its reference is returned in the
/// content type. An inferred schema is remembered for the type only when
/// every field type was observed; values with `None` fields or empty
/// collections are inferred afresh on each encode.
#[derive(Debug, Clone)]
pub struct AvroSchemaCodec<R: SchemaRegistryClient> {
    registry: R,
    config: AvroCodecConfig,
    local_schemas: Arc<RwLock<HashMap<String, Schema>>>,
}

impl<R: SchemaRegistryClient> AvroSchemaCodec<R> {
    /// Creates a codec over `registry`.
    #[must_use]
    pub fn new(registry: R, config: AvroCodecConfig) -> Self {
        Self {
            registry,
            config,
            local_schemas: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the registry client.
    #[must_use]
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AvroCodecConfig {
        &self.config
    }

    /// Returns whether `content_type` is an Avro content type this codec
    /// handles: `application/avro` or any `application/*+avro`.
    #[must_use]
    pub fn supports(content_type: &ContentType) -> bool {
        is_avro(content_type)
    }

    /// Registers every `.avsc` file under the configured schema locations and
    /// remembers each schema for its fully qualified name.
    ///
    /// Returns the number of schemas registered.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaCodecError::SchemaLocation`] when the directory cannot
    /// be read, [`SchemaCodecError::Avro`] when a file does not parse, or a
    /// registry error.
    pub async fn initialize(&self) -> SchemaCodecResult<usize> {
        let Some(directory) = self.config.schema_locations.as_ref() else {
            return Ok(0);
        };
        info!(%directory, "scanning avro schema files");
        let schemas = load_schema_files(directory)?;
        info!(count = schemas.len(), "found avro schema files");

        for (file_name, schema) in &schemas {
            let subject = subject_for(schema)?;
            let registration = self.registry.register(&subject, schema).await?;
            info!(
                file = %file_name,
                reference = %registration.reference(),
                "registered schema file"
            );
            self.remember(full_name_of(schema)?, schema.clone())?;
        }
        Ok(schemas.len())
    }

    /// Encodes a serde payload.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaCodecError::UnsupportedContentType`] for non-Avro
    /// content types and [`SchemaCodecError::SchemaNotFound`] when no schema
    /// is known for the payload type and dynamic generation is disabled.
    pub async fn encode<T>(
        &self,
        payload: &T,
        content_type: &ContentType,
    ) -> SchemaCodecResult<EncodedPayload>
    where
        T: Serialize + Sync + ?Sized,
    {
        ensure_supported(content_type)?;
        let value = apache_avro::to_value(payload).map_err(SchemaCodecError::avro)?;

        if let Some(reference) = SchemaReference::from_content_type(content_type) {
            let schema = self.registry.fetch(&reference).await?;
            return write(&schema, value, &reference);
        }

        let type_name = type_full_name::<T>();
        let schema = self.schema_for_type(&type_name, &value)?;
        let reference = self.register(&schema).await?;
        write(&schema, value, &reference)
    }

    /// Encodes a payload that carries its own schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaCodecError::UnsupportedContentType`] for non-Avro
    /// content types, or an Avro error when the payload does not match the
    /// schema.
    pub async fn encode_described<T>(
        &self,
        payload: &T,
        content_type: &ContentType,
    ) -> SchemaCodecResult<EncodedPayload>
    where
        T: SelfDescribing + Sync + ?Sized,
    {
        ensure_supported(content_type)?;
        let value = payload.to_avro_value()?;

        if let Some(reference) = SchemaReference::from_content_type(content_type) {
            let schema = self.registry.fetch(&reference).await?;
            return write(&schema, value, &reference);
        }

        debug!("payload carries its own schema");
        let reference = self.register(payload.schema()).await?;
        write(payload.schema(), value, &reference)
    }

    /// Decodes Avro bytes into a serde type.
    ///
    /// # Errors
    ///
    /// See [`Self::decode_value`]; additionally fails when the decoded value
    /// does not deserialize into `T`.
    pub async fn decode<T: DeserializeOwned>(
        &self,
        bytes: &[u8],
        content_type: &ContentType,
    ) -> SchemaCodecResult<T> {
        let value = self.decode_value(bytes, content_type).await?;
        apache_avro::from_value::<T>(&value).map_err(SchemaCodecError::avro)
    }

    /// Decodes Avro bytes into an Avro value.
    ///
    /// The writer schema is fetched from the reference in `content_type`.
    /// With a reader schema configured, Avro schema resolution applies.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaCodecError::UnsupportedContentType`] for non-Avro
    /// content types, [`SchemaCodecError::MissingSchemaReference`] when the
    /// content type names no reference and
    /// [`SchemaCodecError::SchemaNotFound`] when the registry does not know it.
    pub async fn decode_value(
        &self,
        bytes: &[u8],
        content_type: &ContentType,
    ) -> SchemaCodecResult<Value> {
        ensure_supported(content_type)?;
        let reference = SchemaReference::from_content_type(content_type)
            .ok_or_else(|| SchemaCodecError::MissingSchemaReference(content_type.to_string()))?;
        let writer = self.registry.fetch(&reference).await?;
        let mut reader = bytes;
        from_avro_datum(&writer, &mut reader, self.config.reader_schema.as_ref())
            .map_err(SchemaCodecError::avro)
    }

    /// Decodes a binary message using its `contentType` header.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaCodecError::MissingContentType`] when the header is
    /// absent, [`SchemaCodecError::NonBinaryPayload`] for text or JSON
    /// payloads, and the errors of [`Self::decode`].
    pub async fn decode_message<T: DeserializeOwned>(&self, message: &Message) -> SchemaCodecResult<T> {
        let content_type = message
            .content_type()?
            .ok_or(SchemaCodecError::MissingContentType)?;
        let bytes = match message.payload() {
            Payload::Bytes(bytes) => bytes,
            other => return Err(SchemaCodecError::NonBinaryPayload(other.kind())),
        };
        self.decode(bytes, &content_type).await
    }

    fn schema_for_type(&self, type_name: &str, value: &Value) -> SchemaCodecResult<Schema> {
        if let Some(schema) = self.lookup(type_name)? {
            return Ok(schema);
        }
        if !self.config.dynamic_schema_generation_enabled {
            return Err(SchemaCodecError::SchemaNotFound(format!(
                "no local schema for {type_name} and dynamic schema generation is disabled"
            )));
        }
        let inferred = infer_record_schema(type_name, value)?;
        debug!(
            type_name,
            complete = inferred.complete,
            "generated schema from payload shape"
        );
        if inferred.complete {
            self.remember(type_name.to_owned(), inferred.schema.clone())?;
        }
        Ok(inferred.schema)
    }

    async fn register(&self, schema: &Schema) -> SchemaCodecResult<SchemaReference> {
        let subject = subject_for(schema)?;
        let registration = self.registry.register(&subject, schema).await?;
        Ok(registration.into_reference())
    }

    fn lookup(&self, type_name: &str) -> SchemaCodecResult<Option<Schema>> {
        let schemas = self.local_schemas.read().map_err(|err| {
            SchemaCodecError::Registry(SchemaRegistryError::state(std::io::Error::other(
                err.to_string(),
            )))
        })?;
        Ok(schemas.get(type_name).cloned())
    }

    fn remember(&self, type_name: String, schema: Schema) -> SchemaCodecResult<()> {
        let mut schemas = self.local_schemas.write().map_err(|err| {
            SchemaCodecError::Registry(SchemaRegistryError::state(std::io::Error::other(
                err.to_string(),
            )))
        })?;
        schemas.entry(type_name).or_insert(schema);
        Ok(())
    }
}

fn is_avro(content_type: &ContentType) -> bool {
    content_type.main_type() == "application"
        && (content_type.subtype() == "avro" || content_type.suffix() == Some("avro"))
}

fn ensure_supported(content_type: &ContentType) -> SchemaCodecResult<()> {
    if is_avro(content_type) {
        Ok(())
    } else {
        Err(SchemaCodecError::UnsupportedContentType(
            content_type.to_string(),
        ))
    }
}

fn write(
    schema: &Schema,
    value: Value,
    reference: &SchemaReference,
) -> SchemaCodecResult<EncodedPayload> {
    let resolved = value.resolve(schema).map_err(SchemaCodecError::avro)?;
    let bytes = to_avro_datum(schema, resolved).map_err(SchemaCodecError::avro)?;
    Ok(EncodedPayload {
        bytes: Bytes::from(bytes),
        content_type: reference.to_content_type()?,
    })
}

fn full_name_of(schema: &Schema) -> SchemaCodecResult<String> {
    schema
        .name()
        .map(|name| name.fullname(None))
        .ok_or(SchemaCodecError::UnnamedSchema)
}

/// Lower-cased fully qualified schema name.
fn subject_for(schema: &Schema) -> SchemaCodecResult<Subject> {
    Ok(Subject::new(full_name_of(schema)?.to_lowercase())?)
}

fn load_schema_files(directory: &Utf8Path) -> SchemaCodecResult<Vec<(String, Schema)>> {
    let dir = Dir::open_ambient_dir(directory, ambient_authority())
        .map_err(SchemaCodecError::schema_location)?;
    let mut file_names = Vec::new();
    for entry in dir.entries().map_err(SchemaCodecError::schema_location)? {
        let dir_entry = entry.map_err(SchemaCodecError::schema_location)?;
        let file_name = dir_entry
            .file_name()
            .map_err(SchemaCodecError::schema_location)?;
        let is_file = dir_entry
            .file_type()
            .map_err(SchemaCodecError::schema_location)?
            .is_file();
        if is_file && file_name.ends_with(SCHEMA_FILE_SUFFIX) {
            file_names.push(file_name);
        }
    }
    file_names.sort();

    file_names
        .into_iter()
        .map(|file_name| {
            let definition = dir
                .read_to_string(&file_name)
                .map_err(SchemaCodecError::schema_location)?;
            let schema = Schema::parse_str(&definition).map_err(SchemaCodecError::avro)?;
            Ok((file_name, schema))
        })
        .collect()
}
