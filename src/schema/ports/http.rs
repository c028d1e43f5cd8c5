//! Minimal JSON-over-HTTP port used by the HTTP registry clients.

use super::SchemaRegistryResult;
use async_trait::async_trait;

/// Static request headers, as `(name, value)` pairs.
pub type RequestHeaders = &'static [(&'static str, &'static str)];

/// Status and decoded JSON body of an HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpJsonResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body; `Null` when the body is empty or not JSON.
    pub body: serde_json::Value,
}

impl HttpJsonResponse {
    /// Returns whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Sends JSON requests and returns JSON responses.
///
/// Implementations report transport failures as
/// [`super::SchemaRegistryError::Transport`] and return non-2xx responses as
/// values so callers can map status codes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpJsonClient: Send + Sync {
    /// Issues a `GET` request.
    ///
    /// # Errors
    ///
    /// Returns a transport error when no response was received.
    async fn get(&self, url: &str, headers: RequestHeaders)
    -> SchemaRegistryResult<HttpJsonResponse>;

    /// Issues a `POST` request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns a transport error when no response was received.
    async fn post(
        &self,
        url: &str,
        headers: RequestHeaders,
        body: &serde_json::Value,
    ) -> SchemaRegistryResult<HttpJsonResponse>;
}
