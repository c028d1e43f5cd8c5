//! Ordered message headers and their scalar values.

use bytes::Bytes;
use std::fmt;

/// Header carrying the payload content type.
pub const CONTENT_TYPE: &str = "contentType";

/// Header recording the content type a payload had before the binder
/// serialized it to bytes.
pub const ORIGINAL_CONTENT_TYPE: &str = "originalContentType";

/// Scalar header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Bytes),
    /// Signed integer.
    Integer(i64),
    /// Boolean flag.
    Boolean(bool),
    /// Floating-point number.
    Float(f64),
}

impl HeaderValue {
    /// Returns the text value, if this is a text header.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the byte form used when the value leaves the process.
    ///
    /// Text and bytes are taken verbatim; every other scalar is coerced to
    /// its string form first.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::Text(text) => Bytes::copy_from_slice(text.as_bytes()),
            Self::Bytes(bytes) => bytes.clone(),
            Self::Integer(_) | Self::Boolean(_) | Self::Float(_) => Bytes::from(self.to_string()),
        }
    }

    /// Builds a value from received bytes: valid UTF-8 becomes text,
    /// anything else stays raw.
    #[must_use]
    pub fn from_received(bytes: Bytes) -> Self {
        match std::str::from_utf8(&bytes) {
            Ok(text) => Self::Text(text.to_owned()),
            Err(_) => Self::Bytes(bytes),
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => formatter.write_str(text),
            Self::Bytes(bytes) => formatter.write_str(&String::from_utf8_lossy(bytes)),
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::Boolean(value) => write!(formatter, "{value}"),
            Self::Float(value) => write!(formatter, "{value}"),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Bytes> for HeaderValue {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<u8>> for HeaderValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for HeaderValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for HeaderValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Insertion-ordered header map with unique names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageHeaders {
    entries: Vec<(String, HeaderValue)>,
}

impl MessageHeaders {
    /// Creates an empty header map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts a header, replacing an existing value in place.
    ///
    /// Returns the previous value when the name was already present.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<HeaderValue>,
    ) -> Option<HeaderValue> {
        let header_name = name.into();
        let header_value = value.into();
        if let Some((_, existing)) = self
            .entries
            .iter_mut()
            .find(|(existing_name, _)| *existing_name == header_name)
        {
            return Some(std::mem::replace(existing, header_value));
        }
        self.entries.push((header_name, header_value));
        None
    }

    /// Removes a header and returns its value.
    pub fn remove(&mut self, name: &str) -> Option<HeaderValue> {
        let position = self
            .entries
            .iter()
            .position(|(existing_name, _)| existing_name == name)?;
        Some(self.entries.remove(position).1)
    }

    /// Returns a header value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(existing_name, _)| existing_name == name)
            .map(|(_, value)| value)
    }

    /// Returns a header value by name when it holds text.
    #[must_use]
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(HeaderValue::as_text)
    }

    /// Returns whether a header with the given name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for MessageHeaders
where
    K: Into<String>,
    V: Into<HeaderValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn insert_replaces_in_place_and_keeps_order() {
        let mut headers = MessageHeaders::new();
        headers.insert("a", "1");
        headers.insert("b", "2");
        let previous = headers.insert("a", "3");

        assert_eq!(previous, Some(HeaderValue::from("1")));
        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(headers.get_text("a"), Some("3"));
    }

    #[test]
    fn remove_drops_the_entry() {
        let mut headers: MessageHeaders = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(headers.remove("a"), Some(HeaderValue::from("1")));
        assert!(!headers.contains("a"));
        assert_eq!(headers.len(), 1);
    }

    #[rstest]
    #[case(HeaderValue::from("text"), b"text".to_vec())]
    #[case(HeaderValue::from(42_i64), b"42".to_vec())]
    #[case(HeaderValue::from(true), b"true".to_vec())]
    #[case(HeaderValue::from(vec![0xff_u8, 0x00]), vec![0xff, 0x00])]
    fn to_bytes_coerces_scalars_to_string_form(
        #[case] value: HeaderValue,
        #[case] expected: Vec<u8>,
    ) {
        assert_eq!(value.to_bytes().as_ref(), expected.as_slice());
    }

    #[test]
    fn from_received_keeps_invalid_utf8_as_bytes() {
        let value = HeaderValue::from_received(Bytes::from_static(&[0xc3, 0x28]));
        assert!(matches!(value, HeaderValue::Bytes(_)));

        let text = HeaderValue::from_received(Bytes::from_static(b"plain"));
        assert_eq!(text.as_text(), Some("plain"));
    }
}
