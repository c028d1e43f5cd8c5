//! Partition keys and the rules that extract them from messages.

use super::PartitionError;
use crate::message::domain::{HeaderValue, Message, Payload};
use bytes::Bytes;
use std::fmt::{self, Write as _};
use std::sync::Arc;

/// Scalar key derived from a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PartitionKey {
    /// Text key.
    Text(String),
    /// Integer key.
    Integer(i64),
    /// Boolean key.
    Boolean(bool),
    /// Binary key.
    Bytes(Bytes),
}

impl PartitionKey {
    /// Returns the canonical text form used for hashing.
    ///
    /// Binary keys render as lower-case hex so that the same bytes hash to
    /// the same partition in every process.
    #[must_use]
    pub fn canonical_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Integer(number) => number.to_string(),
            Self::Boolean(flag) => flag.to_string(),
            Self::Bytes(bytes) => {
                bytes
                    .iter()
                    .fold(String::with_capacity(bytes.len() * 2), |mut hex, byte| {
                        let _ignored = write!(hex, "{byte:02x}");
                        hex
                    })
            }
        }
    }

    fn from_header(value: &HeaderValue) -> Self {
        match value {
            HeaderValue::Text(text) => Self::Text(text.clone()),
            HeaderValue::Bytes(bytes) => Self::Bytes(bytes.clone()),
            HeaderValue::Integer(number) => Self::Integer(*number),
            HeaderValue::Boolean(flag) => Self::Boolean(*flag),
            HeaderValue::Float(number) => Self::Text(number.to_string()),
        }
    }

    fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(flag) => Some(Self::Boolean(*flag)),
            serde_json::Value::Number(number) => Some(
                number
                    .as_i64()
                    .map_or_else(|| Self::Text(number.to_string()), Self::Integer),
            ),
            serde_json::Value::String(text) => Some(Self::Text(text.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Some(Self::Text(value.to_string()))
            }
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.canonical_text())
    }
}

/// User-supplied key extraction.
pub trait PartitionKeyExtractor: Send + Sync + fmt::Debug {
    /// Returns the key for `message`, or `None` to fall back to round-robin.
    fn extract(&self, message: &Message) -> Option<PartitionKey>;
}

/// How a partition key is derived from a message.
#[derive(Debug, Clone)]
pub enum PartitionKeyRule {
    /// Value of the named header.
    Header(String),
    /// Field of a JSON payload addressed by a JSON pointer such as `/a/b`.
    PayloadField(String),
    /// The whole payload.
    Payload,
    /// The same key for every message.
    Fixed(PartitionKey),
    /// Caller-provided extraction.
    Custom(Arc<dyn PartitionKeyExtractor>),
}

impl PartitionKeyRule {
    /// Parses a `partitionKeyExpression` property value.
    ///
    /// Supported forms are `payload`, `payload.a.b`, `headers.NAME` and
    /// `headers['NAME']`.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::InvalidKeyExpression`] for any other form.
    pub fn parse_expression(expression: &str) -> Result<Self, PartitionError> {
        let trimmed = expression.trim();
        let invalid = || PartitionError::InvalidKeyExpression(expression.to_owned());

        if trimmed == "payload" {
            return Ok(Self::Payload);
        }
        if let Some(path) = trimmed.strip_prefix("payload.") {
            let segments: Vec<&str> = path.split('.').collect();
            if segments.iter().any(|segment| segment.is_empty()) {
                return Err(invalid());
            }
            let pointer = segments.iter().fold(String::new(), |mut pointer, segment| {
                pointer.push('/');
                pointer.push_str(&segment.replace('~', "~0").replace('/', "~1"));
                pointer
            });
            return Ok(Self::PayloadField(pointer));
        }
        if let Some(name) = trimmed.strip_prefix("headers.") {
            return non_empty(name).map(Self::header).ok_or_else(invalid);
        }
        if let Some(indexed) = trimmed
            .strip_prefix("headers[")
            .and_then(|rest| rest.strip_suffix(']'))
        {
            return strip_quotes(indexed)
                .and_then(non_empty)
                .map(Self::header)
                .ok_or_else(invalid);
        }
        Err(invalid())
    }

    fn header(name: &str) -> Self {
        Self::Header(name.to_owned())
    }

    /// Evaluates the rule against a message.
    #[must_use]
    pub fn extract(&self, message: &Message) -> Option<PartitionKey> {
        match self {
            Self::Header(name) => message.headers().get(name).map(PartitionKey::from_header),
            Self::PayloadField(pointer) => payload_field(message.payload(), pointer),
            Self::Payload => match message.payload() {
                Payload::Bytes(bytes) => Some(PartitionKey::Bytes(bytes.clone())),
                Payload::Text(text) => Some(PartitionKey::Text(text.clone())),
                Payload::Json(value) => PartitionKey::from_json(value),
            },
            Self::Fixed(key) => Some(key.clone()),
            Self::Custom(extractor) => extractor.extract(message),
        }
    }
}

fn payload_field(payload: &Payload, pointer: &str) -> Option<PartitionKey> {
    match payload {
        Payload::Json(value) => value.pointer(pointer).and_then(PartitionKey::from_json),
        Payload::Text(text) => serde_json::from_str::<serde_json::Value>(text)
            .ok()
            .and_then(|value| value.pointer(pointer).and_then(PartitionKey::from_json)),
        Payload::Bytes(_) => None,
    }
}

fn strip_quotes(value: &str) -> Option<&str> {
    value
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .or_else(|| {
            value
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
        })
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value).filter(|candidate| !candidate.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("payload", "Payload")]
    #[case("payload.customer.id", "PayloadField(\"/customer/id\")")]
    #[case("headers.orderId", "Header(\"orderId\")")]
    #[case("headers['order-id']", "Header(\"order-id\")")]
    #[case("headers[\"order-id\"]", "Header(\"order-id\")")]
    fn parses_supported_expressions(#[case] expression: &str, #[case] expected: &str) {
        let rule = PartitionKeyRule::parse_expression(expression).expect("expression should parse");
        assert_eq!(format!("{rule:?}"), expected);
    }

    #[rstest]
    #[case("")]
    #[case("headers.")]
    #[case("headers['']")]
    #[case("payload..id")]
    #[case("random()")]
    fn rejects_unsupported_expressions(#[case] expression: &str) {
        assert!(matches!(
            PartitionKeyRule::parse_expression(expression),
            Err(PartitionError::InvalidKeyExpression(_))
        ));
    }

    #[test]
    fn payload_field_reads_json_and_json_text() {
        let rule = PartitionKeyRule::PayloadField("/customer/id".to_owned());
        let json_message = Message::new(json!({"customer": {"id": 42}}));
        let text_message = Message::new(r#"{"customer": {"id": "c-1"}}"#);

        assert_eq!(rule.extract(&json_message), Some(PartitionKey::Integer(42)));
        assert_eq!(
            rule.extract(&text_message),
            Some(PartitionKey::Text("c-1".to_owned()))
        );
        assert_eq!(rule.extract(&Message::new(vec![1_u8])), None);
    }

    #[test]
    fn header_rule_returns_none_when_absent() {
        let rule = PartitionKeyRule::Header("key".to_owned());
        assert_eq!(rule.extract(&Message::new("body")), None);
        assert_eq!(
            rule.extract(&Message::new("body").with_header("key", true)),
            Some(PartitionKey::Boolean(true))
        );
    }

    #[test]
    fn bytes_key_renders_as_lower_hex() {
        let key = PartitionKey::Bytes(Bytes::from_static(&[0x0a, 0xff]));
        assert_eq!(key.canonical_text(), "0aff");
    }
}
