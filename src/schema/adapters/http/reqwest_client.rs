//! `reqwest` implementation of the HTTP port.

use crate::schema::ports::{
    HttpJsonClient, HttpJsonResponse, RequestHeaders, SchemaRegistryError, SchemaRegistryResult,
};
use async_trait::async_trait;

/// [`HttpJsonClient`] backed by a shared `reqwest` client.
///
/// Timeouts and TLS settings come from the supplied client.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Builds a client with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaRegistryError::Transport`] when the TLS backend cannot
    /// be initialised.
    pub fn new() -> SchemaRegistryResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(SchemaRegistryError::transport)?;
        Ok(Self { client })
    }

    /// Wraps a preconfigured client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> SchemaRegistryResult<HttpJsonResponse> {
        let response = request.send().await.map_err(SchemaRegistryError::transport)?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(SchemaRegistryError::transport)?;
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
        };
        Ok(HttpJsonResponse { status, body: json })
    }
}

fn with_headers(
    mut request: reqwest::RequestBuilder,
    headers: RequestHeaders,
) -> reqwest::RequestBuilder {
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    request
}

#[async_trait]
impl HttpJsonClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: RequestHeaders) -> SchemaRegistryResult<HttpJsonResponse> {
        let request = with_headers(self.client.get(url), headers);
        self.execute(request).await
    }

    async fn post(
        &self,
        url: &str,
        headers: RequestHeaders,
        body: &serde_json::Value,
    ) -> SchemaRegistryResult<HttpJsonResponse> {
        let request = with_headers(self.client.post(url), headers).json(body);
        self.execute(request).await
    }
}
