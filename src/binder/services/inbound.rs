//! Inbound message pipeline: header extraction, payload restoration and
//! handler delivery with retry.

use super::binding::publish_event;
use crate::binder::{
    domain::{
        BinderEvent, BindingId, ConsumerProperties, DestinationName, HeaderMode,
        MalformedEnvelopePolicy, RetryPolicy,
    },
    ports::{MessageHandler, RecordSink, TransportRecord},
};
use crate::envelope::{self, EnvelopeError};
use crate::message::domain::{
    CONTENT_TYPE, ContentType, HeaderValue, Message, MessageHeaders, ORIGINAL_CONTENT_TYPE,
    Payload,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

pub(super) struct InboundPipeline {
    binding: BindingId,
    destination: DestinationName,
    handler: Arc<dyn MessageHandler>,
    header_mode: HeaderMode,
    native_headers: bool,
    policy: MalformedEnvelopePolicy,
    retry: RetryPolicy,
    events: broadcast::Sender<BinderEvent>,
}

impl InboundPipeline {
    pub(super) fn new(
        binding: BindingId,
        destination: DestinationName,
        handler: Arc<dyn MessageHandler>,
        properties: &ConsumerProperties,
        native_headers: bool,
        events: broadcast::Sender<BinderEvent>,
    ) -> Self {
        Self {
            binding,
            destination,
            handler,
            header_mode: properties.header_mode(),
            native_headers,
            policy: properties.malformed_envelope_policy(),
            retry: properties.retry(),
            events,
        }
    }

    fn to_message(&self, record: TransportRecord) -> Option<Message> {
        let TransportRecord {
            payload,
            headers: native,
            ..
        } = record;
        let (body, mut headers) = match (self.header_mode, self.native_headers) {
            (HeaderMode::None, _) | (HeaderMode::Native, false) => (payload, MessageHeaders::new()),
            (_, true) => (payload, native.into_message_headers()),
            (HeaderMode::Embedded, false) => match envelope::decode(&payload) {
                Ok(decoded) => (decoded.payload, decoded.headers.into_message_headers()),
                Err(err) => return self.malformed(payload, &err),
            },
        };
        let restored = restore(body, &mut headers);
        Some(Message::from_parts(restored, headers))
    }

    fn malformed(&self, raw: Bytes, err: &EnvelopeError) -> Option<Message> {
        match self.policy {
            MalformedEnvelopePolicy::Drop => {
                warn!(
                    binding = %self.binding,
                    destination = %self.destination,
                    error = %err,
                    "dropping message with malformed embedded headers"
                );
                None
            }
            MalformedEnvelopePolicy::ErrorChannel => {
                warn!(
                    binding = %self.binding,
                    destination = %self.destination,
                    error = %err,
                    "routing message with malformed embedded headers to the error channel"
                );
                publish_event(
                    &self.events,
                    BinderEvent::MalformedEnvelope {
                        binding: self.binding,
                        destination: self.destination.clone(),
                        reason: err.to_string(),
                        raw,
                    },
                );
                None
            }
            MalformedEnvelopePolicy::Raw => {
                debug!(
                    binding = %self.binding,
                    error = %err,
                    "delivering undecodable envelope as raw bytes"
                );
                Some(Message::new(raw))
            }
        }
    }

    async fn deliver(&self, message: Message) {
        let max_attempts = self.retry.max_attempts();
        let mut attempt: u32 = 1;
        loop {
            let Err(err) = self.handler.handle(message.clone()).await else {
                return;
            };
            if attempt >= max_attempts {
                error!(
                    binding = %self.binding,
                    destination = %self.destination,
                    attempts = attempt,
                    error = %err,
                    "message delivery failed"
                );
                publish_event(
                    &self.events,
                    BinderEvent::DeliveryFailed {
                        binding: self.binding,
                        destination: self.destination.clone(),
                        attempts: attempt,
                        reason: err.to_string(),
                        message: Box::new(message),
                    },
                );
                return;
            }
            let delay = self.retry.delay_after(attempt);
            warn!(
                binding = %self.binding,
                attempt,
                delay_ms = delay.as_millis(),
                error = %err,
                "message handler failed; retrying"
            );
            tokio::time::sleep(delay).await;
            attempt = attempt.saturating_add(1);
        }
    }
}

#[async_trait]
impl RecordSink for InboundPipeline {
    async fn accept(&self, record: TransportRecord) {
        if let Some(message) = self.to_message(record) {
            self.deliver(message).await;
        }
    }
}

/// Restores the payload type recorded in `originalContentType`.
///
/// The marker header is removed and becomes the content type when the
/// message declares none. Payloads that do not decode as recorded stay raw.
fn restore(body: Bytes, headers: &mut MessageHeaders) -> Payload {
    let Some(HeaderValue::Text(original)) = headers.remove(ORIGINAL_CONTENT_TYPE) else {
        return Payload::Bytes(body);
    };
    let Ok(recorded) = ContentType::parse(&original) else {
        warn!(original_content_type = %original, "unparseable original content type");
        return Payload::Bytes(body);
    };
    if !headers.contains(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, recorded.to_string());
    }

    if recorded == ContentType::text_plain() {
        return match String::from_utf8(body.to_vec()) {
            Ok(text) => Payload::Text(text),
            Err(err) => {
                warn!(error = %err, "text payload is not valid UTF-8; delivered as bytes");
                Payload::Bytes(body)
            }
        };
    }
    if recorded == ContentType::application_json() {
        return match serde_json::from_slice(&body) {
            Ok(document) => Payload::Json(document),
            Err(err) => {
                warn!(error = %err, "JSON payload does not parse; delivered as bytes");
                Payload::Bytes(body)
            }
        };
    }
    Payload::Bytes(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn restores_text_and_sets_content_type() {
        let mut headers = MessageHeaders::new();
        headers.insert(ORIGINAL_CONTENT_TYPE, "text/plain");

        let payload = restore(Bytes::from_static(b"hello"), &mut headers);

        assert_eq!(payload, Payload::Text("hello".to_owned()));
        assert!(!headers.contains(ORIGINAL_CONTENT_TYPE));
        assert_eq!(headers.get_text(CONTENT_TYPE), Some("text/plain"));
    }

    #[test]
    fn restores_json_without_overriding_declared_content_type() {
        let mut headers = MessageHeaders::new();
        headers.insert(ORIGINAL_CONTENT_TYPE, "application/json");
        headers.insert(CONTENT_TYPE, "application/vnd.order+json");

        let payload = restore(Bytes::from_static(br#"{"id":7}"#), &mut headers);

        assert_eq!(payload, Payload::Json(json!({"id": 7})));
        assert_eq!(
            headers.get_text(CONTENT_TYPE),
            Some("application/vnd.order+json")
        );
    }

    #[test]
    fn unmarked_payloads_stay_bytes() {
        let mut headers = MessageHeaders::new();
        headers.insert(CONTENT_TYPE, "application/json");

        let payload = restore(Bytes::from_static(b"{}"), &mut headers);

        assert_eq!(payload, Payload::Bytes(Bytes::from_static(b"{}")));
    }

    #[test]
    fn undecodable_text_stays_bytes() {
        let mut headers = MessageHeaders::new();
        headers.insert(ORIGINAL_CONTENT_TYPE, "text/plain");

        let payload = restore(Bytes::from_static(&[0xff, 0xfe]), &mut headers);

        assert_eq!(payload, Payload::Bytes(Bytes::from_static(&[0xff, 0xfe])));
    }
}
