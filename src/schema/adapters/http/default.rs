//! Client for the stream schema server protocol.

use super::{expect_success, parse_definition, read_u32, trim_endpoint};
use crate::schema::{
    domain::{AVRO_FORMAT, SchemaReference, SchemaRegistration, Subject},
    ports::{HttpJsonClient, SchemaRegistryClient, SchemaRegistryError, SchemaRegistryResult},
};
use apache_avro::Schema;
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

/// Endpoint used when none is configured.
pub const DEFAULT_SCHEMA_SERVER_ENDPOINT: &str = "http://localhost:8990";

/// Schema server client.
///
/// Registration posts `{subject, format, definition}` to the endpoint root;
/// lookups use `/{subject}/{format}/v{version}` and `/schemas/{id}`.
#[derive(Debug, Clone)]
pub struct DefaultSchemaRegistryClient<H: HttpJsonClient> {
    http: H,
    endpoint: String,
}

impl<H: HttpJsonClient> DefaultSchemaRegistryClient<H> {
    /// Creates a client for `endpoint`.
    #[must_use]
    pub fn new(http: H, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: trim_endpoint(endpoint),
        }
    }

    /// Creates a client for [`DEFAULT_SCHEMA_SERVER_ENDPOINT`].
    #[must_use]
    pub fn with_default_endpoint(http: H) -> Self {
        Self::new(http, DEFAULT_SCHEMA_SERVER_ENDPOINT)
    }

    /// Returns the endpoint without a trailing slash.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl<H: HttpJsonClient> SchemaRegistryClient for DefaultSchemaRegistryClient<H> {
    async fn register(
        &self,
        subject: &Subject,
        schema: &Schema,
    ) -> SchemaRegistryResult<SchemaRegistration> {
        let definition =
            serde_json::to_string(schema).map_err(SchemaRegistryError::invalid_schema)?;
        let request = json!({
            "subject": subject.as_str(),
            "format": AVRO_FORMAT,
            "definition": definition,
        });
        let response = self.http.post(&self.endpoint, &[], &request).await?;
        let body = expect_success(response, || format!("subject {subject}"))?;

        let version = read_u32(&body, "version")?;
        let id = read_u32(&body, "id")?;
        let format = body
            .get("format")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(AVRO_FORMAT);
        let reference = SchemaReference::new(subject.clone(), version, format)?;
        debug!(%reference, id, "registered schema with schema server");
        Ok(SchemaRegistration::new(reference, Some(id)))
    }

    async fn fetch(&self, reference: &SchemaReference) -> SchemaRegistryResult<Schema> {
        let url = format!(
            "{}/{}/{}/v{}",
            self.endpoint,
            reference.subject(),
            reference.format(),
            reference.version()
        );
        let response = self.http.get(&url, &[]).await?;
        let body = expect_success(response, || reference.to_string())?;
        parse_definition(&body, "definition")
    }

    async fn fetch_by_id(&self, id: u32) -> SchemaRegistryResult<Schema> {
        let url = format!("{}/schemas/{id}", self.endpoint);
        let response = self.http.get(&url, &[]).await?;
        let body = expect_success(response, || format!("id {id}"))?;
        parse_definition(&body, "definition")
    }
}
