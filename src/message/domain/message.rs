//! Message envelope aggregate.

use super::{CONTENT_TYPE, ContentType, HeaderValue, MessageDomainError, MessageHeaders};
use bytes::Bytes;

/// Message payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Opaque bytes, sent as-is.
    Bytes(Bytes),
    /// UTF-8 text.
    Text(String),
    /// Structured JSON document.
    Json(serde_json::Value),
}

impl Payload {
    /// Returns the bytes when the payload is already binary.
    #[must_use]
    pub const fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Text(_) | Self::Json(_) => None,
        }
    }

    /// Returns the payload kind for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Text(_) => "text",
            Self::Json(_) => "json",
        }
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<&'static [u8]> for Payload {
    fn from(value: &'static [u8]) -> Self {
        Self::Bytes(Bytes::from_static(value))
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Immutable message envelope: a payload plus ordered headers.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    payload: Payload,
    headers: MessageHeaders,
}

impl Message {
    /// Creates a message without headers.
    #[must_use]
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            headers: MessageHeaders::new(),
        }
    }

    /// Creates a message from a payload and headers.
    #[must_use]
    pub const fn from_parts(payload: Payload, headers: MessageHeaders) -> Self {
        Self { payload, headers }
    }

    /// Returns a copy of this message with one more header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns a copy of this message with the `contentType` header set.
    #[must_use]
    pub fn with_content_type(self, content_type: &ContentType) -> Self {
        self.with_header(CONTENT_TYPE, content_type.to_string())
    }

    /// Returns the payload.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the headers.
    #[must_use]
    pub const fn headers(&self) -> &MessageHeaders {
        &self.headers
    }

    /// Parses the `contentType` header.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDomainError`] when the header is present but is not
    /// text or does not parse.
    pub fn content_type(&self) -> Result<Option<ContentType>, MessageDomainError> {
        match self.headers.get(CONTENT_TYPE) {
            None => Ok(None),
            Some(HeaderValue::Text(raw)) => ContentType::parse(raw).map(Some),
            Some(_) => Err(MessageDomainError::NonTextHeader {
                name: CONTENT_TYPE.to_owned(),
            }),
        }
    }

    /// Splits the message into payload and headers.
    #[must_use]
    pub fn into_parts(self) -> (Payload, MessageHeaders) {
        (self.payload, self.headers)
    }
}

impl From<Payload> for Message {
    fn from(payload: Payload) -> Self {
        Self::new(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_is_parsed_from_header() {
        let message = Message::new("hello").with_content_type(&ContentType::text_plain());
        let parsed = message.content_type().expect("content type should parse");
        assert_eq!(parsed, Some(ContentType::text_plain()));
    }

    #[test]
    fn non_text_content_type_is_rejected() {
        let message = Message::new("hello").with_header(CONTENT_TYPE, 7_i64);
        assert!(matches!(
            message.content_type(),
            Err(MessageDomainError::NonTextHeader { .. })
        ));
    }

    #[test]
    fn payload_kind_reflects_variant() {
        assert_eq!(Message::new(vec![1_u8]).payload().kind(), "bytes");
        assert_eq!(Message::new("x").payload().kind(), "text");
        assert_eq!(
            Message::new(serde_json::json!({"a": 1})).payload().kind(),
            "json"
        );
    }
}
