//! HTTP schema registry clients.

mod confluent;
mod default;
mod reqwest_client;

pub use confluent::{ConfluentSchemaRegistryClient, DEFAULT_CONFLUENT_ENDPOINT};
pub use default::{DEFAULT_SCHEMA_SERVER_ENDPOINT, DefaultSchemaRegistryClient};
pub use reqwest_client::ReqwestHttpClient;

use crate::schema::ports::{HttpJsonResponse, SchemaRegistryError, SchemaRegistryResult};
use apache_avro::Schema;

/// Maps non-2xx responses to errors and returns the body otherwise.
fn expect_success(
    response: HttpJsonResponse,
    missing: impl FnOnce() -> String,
) -> SchemaRegistryResult<serde_json::Value> {
    match response.status {
        _ if response.is_success() => Ok(response.body),
        404 => Err(SchemaRegistryError::SchemaNotFound(missing())),
        status => Err(SchemaRegistryError::Http { status }),
    }
}

/// Reads a string field holding a schema definition and parses it.
fn parse_definition(body: &serde_json::Value, field: &str) -> SchemaRegistryResult<Schema> {
    let definition = body
        .get(field)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| SchemaRegistryError::InvalidResponse(format!("missing '{field}'")))?;
    Schema::parse_str(definition).map_err(SchemaRegistryError::invalid_schema)
}

/// Reads a non-negative integer field that fits in `u32`.
fn read_u32(body: &serde_json::Value, field: &str) -> SchemaRegistryResult<u32> {
    body.get(field)
        .and_then(serde_json::Value::as_u64)
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| SchemaRegistryError::InvalidResponse(format!("missing '{field}'")))
}

fn trim_endpoint(endpoint: impl Into<String>) -> String {
    endpoint.into().trim_end_matches('/').to_owned()
}
