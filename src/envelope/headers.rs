//! Byte-valued headers as they appear on the wire.

use crate::message::domain::{HeaderValue, MessageHeaders};
use bytes::Bytes;

/// Ordered headers with unique names and raw byte values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedHeaders {
    entries: Vec<(String, Bytes)>,
}

impl EmbeddedHeaders {
    /// Creates an empty header set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Converts message headers, coercing every value to its byte form.
    #[must_use]
    pub fn from_message_headers(headers: &MessageHeaders) -> Self {
        headers
            .iter()
            .map(|(name, value)| (name.to_owned(), value.to_bytes()))
            .collect()
    }

    /// Converts back to message headers.
    ///
    /// UTF-8 values become text headers; other values stay raw bytes.
    #[must_use]
    pub fn into_message_headers(self) -> MessageHeaders {
        self.entries
            .into_iter()
            .map(|(name, value)| (name, HeaderValue::from_received(value)))
            .collect()
    }

    /// Inserts a header, replacing an existing value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Bytes>) -> Option<Bytes> {
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

    /// Returns a header value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Bytes> {
        self.entries
            .iter()
            .find(|(existing_name, _)| existing_name == name)
            .map(|(_, value)| value)
    }

    /// Iterates headers in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for EmbeddedHeaders
where
    K: Into<String>,
    V: Into<Bytes>,
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

    #[test]
    fn message_header_values_coerce_to_bytes() {
        let mut headers = MessageHeaders::new();
        headers.insert("traceId", "t-1");
        headers.insert("retries", 3_i64);
        headers.insert("replay", true);
        headers.insert("blob", Bytes::from_static(&[0xff, 0x00]));

        let embedded = EmbeddedHeaders::from_message_headers(&headers);

        let names: Vec<&str> = embedded.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["traceId", "retries", "replay", "blob"]);
        assert_eq!(embedded.get("retries"), Some(&Bytes::from_static(b"3")));
        assert_eq!(embedded.get("replay"), Some(&Bytes::from_static(b"true")));
        assert_eq!(embedded.get("blob"), Some(&Bytes::from_static(&[0xff, 0x00])));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut embedded: EmbeddedHeaders = [("a", "1"), ("b", "2")].into_iter().collect();

        let previous = embedded.insert("a", "3");

        assert_eq!(previous, Some(Bytes::from_static(b"1")));
        let names: Vec<&str> = embedded.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(embedded.get("a"), Some(&Bytes::from_static(b"3")));
    }
}
