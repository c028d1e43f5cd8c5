//! Property tests for the embedded-header envelope.
#![expect(clippy::expect_used, reason = "test assertions")]

use bytes::Bytes;
use proptest::prelude::*;
use stream_binder::envelope::{EmbeddedHeaders, EnvelopeError, decode, encode};

fn header_sets() -> impl Strategy<Value = EmbeddedHeaders> {
    proptest::collection::btree_map(
        "[A-Za-z][A-Za-z0-9_-]{0,15}",
        proptest::collection::vec(any::<u8>(), 0..32),
        1..8,
    )
    .prop_map(|headers| headers.into_iter().collect())
}

fn header_section_len(headers: &EmbeddedHeaders) -> usize {
    1 + headers
        .iter()
        .map(|(name, value)| 1 + name.len() + 4 + value.len())
        .sum::<usize>()
}

proptest! {
    #[test]
    fn decoding_restores_headers_in_order_and_payload(
        headers in header_sets(),
        payload in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let wire = encode(&payload, &headers).expect("encodes");
        let decoded = decode(&wire).expect("decodes");

        prop_assert_eq!(decoded.payload.to_vec(), payload);
        prop_assert_eq!(decoded.headers, headers);
    }

    #[test]
    fn any_cut_inside_the_header_section_is_malformed(
        headers in header_sets(),
        payload in proptest::collection::vec(any::<u8>(), 0..16),
        cut in any::<prop::sample::Index>(),
    ) {
        let wire = encode(&payload, &headers).expect("encodes");
        let truncated = wire.slice(..cut.index(header_section_len(&headers)));

        let result = decode(&truncated);

        prop_assert!(
            matches!(result, Err(EnvelopeError::Malformed { .. })),
            "expected malformed, got {:?}",
            result
        );
    }

    #[test]
    fn arbitrary_input_never_panics(raw in proptest::collection::vec(any::<u8>(), 0..128)) {
        let wire = Bytes::from(raw);
        if let Ok(decoded) = decode(&wire) {
            prop_assert!(decoded.payload.len() < wire.len());
        }
    }
}

#[test]
fn zero_header_count_yields_the_remaining_bytes() {
    let decoded = decode(&Bytes::from_static(b"\x00body")).expect("decodes");

    assert!(decoded.headers.is_empty());
    assert_eq!(decoded.payload, Bytes::from_static(b"body"));
}
