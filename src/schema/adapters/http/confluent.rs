//! Client for the Confluent schema registry protocol.

use super::{expect_success, parse_definition, read_u32, trim_endpoint};
use crate::schema::{
    domain::{SchemaReference, SchemaRegistration, Subject},
    ports::{
        HttpJsonClient, RequestHeaders, SchemaRegistryClient, SchemaRegistryError,
        SchemaRegistryResult,
    },
};
use apache_avro::Schema;
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

/// Endpoint used when none is configured.
pub const DEFAULT_CONFLUENT_ENDPOINT: &str = "http://localhost:8081";

const ACCEPT: &str =
    "application/vnd.schemaregistry.v1+json, application/vnd.schemaregistry+json, application/json";

const REGISTER_HEADERS: RequestHeaders = &[("Accept", ACCEPT), ("Content-Type", "application/json")];

const FETCH_HEADERS: RequestHeaders = &[
    ("Accept", ACCEPT),
    ("Content-Type", "application/vnd.schemaregistry.v1+json"),
];

/// Confluent schema registry client.
///
/// Confluent assigns registry-wide ids rather than per-subject versions the
/// client can resolve directly, so the returned reference carries the id in
/// its version slot and [`SchemaRegistryClient::fetch`] resolves it through
/// `/schemas/ids/{id}`.
#[derive(Debug, Clone)]
pub struct ConfluentSchemaRegistryClient<H: HttpJsonClient> {
    http: H,
    endpoint: String,
}

impl<H: HttpJsonClient> ConfluentSchemaRegistryClient<H> {
    /// Creates a client for `endpoint`.
    #[must_use]
    pub fn new(http: H, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: trim_endpoint(endpoint),
        }
    }

    /// Creates a client for [`DEFAULT_CONFLUENT_ENDPOINT`].
    #[must_use]
    pub fn with_default_endpoint(http: H) -> Self {
        Self::new(http, DEFAULT_CONFLUENT_ENDPOINT)
    }

    async fn fetch_id(&self, id: u32) -> SchemaRegistryResult<Schema> {
        let url = format!("{}/schemas/ids/{id}", self.endpoint);
        let response = self.http.get(&url, FETCH_HEADERS).await?;
        let body = expect_success(response, || format!("id {id}"))?;
        parse_definition(&body, "schema")
    }
}

#[async_trait]
impl<H: HttpJsonClient> SchemaRegistryClient for ConfluentSchemaRegistryClient<H> {
    async fn register(
        &self,
        subject: &Subject,
        schema: &Schema,
    ) -> SchemaRegistryResult<SchemaRegistration> {
        let definition =
            serde_json::to_string(schema).map_err(SchemaRegistryError::invalid_schema)?;
        let url = format!("{}/subjects/{subject}/versions", self.endpoint);
        let response = self
            .http
            .post(&url, REGISTER_HEADERS, &json!({ "schema": definition }))
            .await?;
        let body = expect_success(response, || format!("subject {subject}"))?;

        let id = read_u32(&body, "id")?;
        let reference = SchemaReference::avro(subject.clone(), id)?;
        debug!(%reference, id, "registered schema with confluent registry");
        Ok(SchemaRegistration::new(reference, Some(id)))
    }

    async fn fetch(&self, reference: &SchemaReference) -> SchemaRegistryResult<Schema> {
        self.fetch_id(reference.version()).await
    }

    async fn fetch_by_id(&self, id: u32) -> SchemaRegistryResult<Schema> {
        self.fetch_id(id).await
    }
}
