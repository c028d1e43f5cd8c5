//! Encoding and decoding of the embedded-header envelope.

use super::{EmbeddedHeaders, EnvelopeError, EnvelopeResult, MalformedReason};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Smallest number of bytes one header can occupy: name length, a one-byte
/// name and the value length.
const MIN_HEADER_LEN: usize = 1 + 1 + 4;

/// Result of decoding an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEnvelope {
    /// Payload bytes following the header section.
    pub payload: Bytes,
    /// Headers in wire order.
    pub headers: EmbeddedHeaders,
}

/// Encodes every header in front of the payload.
///
/// # Errors
///
/// Returns [`EnvelopeError`] when there are more than 255 headers or a header
/// name or value does not fit its length prefix.
pub fn encode(payload: &[u8], headers: &EmbeddedHeaders) -> EnvelopeResult<Bytes> {
    let entries: Vec<(&str, &Bytes)> = headers.iter().collect();
    write_envelope(payload, &entries)
}

/// Encodes only the named headers, in the order they are listed.
///
/// Names absent from `headers` are skipped.
///
/// # Errors
///
/// Returns [`EnvelopeError`] under the same conditions as [`encode`].
pub fn encode_selected<S: AsRef<str>>(
    payload: &[u8],
    headers: &EmbeddedHeaders,
    names: &[S],
) -> EnvelopeResult<Bytes> {
    let mut entries: Vec<(&str, &Bytes)> = Vec::with_capacity(names.len());
    for name in names {
        let requested = name.as_ref();
        if entries.iter().any(|(existing, _)| *existing == requested) {
            continue;
        }
        if let Some(value) = headers.get(requested) {
            entries.push((requested, value));
        }
    }
    write_envelope(payload, &entries)
}

fn write_envelope(payload: &[u8], entries: &[(&str, &Bytes)]) -> EnvelopeResult<Bytes> {
    let count =
        u8::try_from(entries.len()).map_err(|_| EnvelopeError::TooManyHeaders(entries.len()))?;

    let header_len: usize = entries
        .iter()
        .map(|(name, value)| 1 + name.len() + 4 + value.len())
        .sum();
    let mut buffer = BytesMut::with_capacity(1 + header_len + payload.len());
    buffer.put_u8(count);

    for (name, value) in entries {
        if name.is_empty() || !name.is_ascii() {
            return Err(EnvelopeError::InvalidHeaderName((*name).to_owned()));
        }
        let name_len =
            u8::try_from(name.len()).map_err(|_| EnvelopeError::HeaderNameTooLong((*name).to_owned()))?;
        let value_len =
            u32::try_from(value.len()).map_err(|_| EnvelopeError::HeaderValueTooLong {
                name: (*name).to_owned(),
                length: value.len(),
            })?;
        buffer.put_u8(name_len);
        buffer.put_slice(name.as_bytes());
        buffer.put_u32(value_len);
        buffer.put_slice(value);
    }

    buffer.put_slice(payload);
    Ok(buffer.freeze())
}

/// Decodes an envelope into headers and payload.
///
/// A header count of zero is valid and yields an empty header set.
///
/// # Errors
///
/// Returns [`EnvelopeError::Malformed`] with the failing offset when the
/// declared lengths run past the input, a name is not ASCII or a name repeats.
pub fn decode(wire: &Bytes) -> EnvelopeResult<DecodedEnvelope> {
    let mut reader = Reader::new(wire);

    let count = reader.read_u8(MalformedReason::Empty)?;
    if usize::from(count).saturating_mul(MIN_HEADER_LEN) > reader.remaining() {
        return Err(EnvelopeError::malformed(
            0,
            MalformedReason::HeaderCountExceedsInput { declared: count },
        ));
    }

    let mut headers = EmbeddedHeaders::new();
    for _ in 0..count {
        let name_offset = reader.offset();
        let name_len = reader.read_u8(MalformedReason::TruncatedNameLength)?;
        let name_bytes = reader.read_slice(usize::from(name_len), MalformedReason::TruncatedName)?;
        let name = std::str::from_utf8(&name_bytes)
            .ok()
            .filter(|name| !name.is_empty() && name.is_ascii())
            .ok_or_else(|| EnvelopeError::malformed(name_offset, MalformedReason::InvalidName))?
            .to_owned();

        let declared_len = reader.read_u32(MalformedReason::TruncatedValueLength)?;
        let value_len = usize::try_from(declared_len).map_err(|_| {
            EnvelopeError::malformed(reader.offset(), MalformedReason::TruncatedValue)
        })?;
        let value = reader.read_slice(value_len, MalformedReason::TruncatedValue)?;

        if headers.insert(name, value).is_some() {
            return Err(EnvelopeError::malformed(
                name_offset,
                MalformedReason::DuplicateName,
            ));
        }
    }

    Ok(DecodedEnvelope {
        payload: reader.rest(),
        headers,
    })
}

/// Bounds-checked cursor over the wire bytes.
struct Reader<'a> {
    wire: &'a Bytes,
    cursor: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(wire: &'a Bytes) -> Self {
        Self {
            wire,
            cursor: wire.as_ref(),
        }
    }

    fn offset(&self) -> usize {
        self.wire.len().saturating_sub(self.cursor.remaining())
    }

    fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    fn read_u8(&mut self, reason: MalformedReason) -> EnvelopeResult<u8> {
        if self.cursor.remaining() < 1 {
            return Err(EnvelopeError::malformed(self.offset(), reason));
        }
        Ok(self.cursor.get_u8())
    }

    fn read_u32(&mut self, reason: MalformedReason) -> EnvelopeResult<u32> {
        if self.cursor.remaining() < 4 {
            return Err(EnvelopeError::malformed(self.offset(), reason));
        }
        Ok(self.cursor.get_u32())
    }

    fn read_slice(&mut self, len: usize, reason: MalformedReason) -> EnvelopeResult<Bytes> {
        let start = self.offset();
        if self.cursor.remaining() < len {
            return Err(EnvelopeError::malformed(start, reason));
        }
        self.cursor.advance(len);
        Ok(self.wire.slice(start..start.saturating_add(len)))
    }

    fn rest(&self) -> Bytes {
        self.wire.slice(self.offset()..)
    }
}
