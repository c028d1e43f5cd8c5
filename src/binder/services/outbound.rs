//! Outbound message pipeline: partition routing, payload serialization and
//! header placement.

use super::{BinderError, BinderResult};
use crate::binder::{
    domain::{DestinationName, HeaderMode, ProducerProperties},
    ports::TransportRecord,
};
use crate::envelope::{self, EmbeddedHeaders};
use crate::message::domain::{
    CONTENT_TYPE, ContentType, HeaderValue, Message, MessageHeaders, ORIGINAL_CONTENT_TYPE,
    Payload,
};
use crate::partition::PartitionRouter;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{error, warn};

#[derive(Debug)]
pub(super) struct OutboundPipeline {
    destination: DestinationName,
    router: Option<PartitionRouter>,
    header_mode: HeaderMode,
    native_headers: bool,
    embedded_names: Vec<String>,
    content_type: Option<ContentType>,
}

impl OutboundPipeline {
    pub(super) fn new(
        destination: DestinationName,
        router: Option<PartitionRouter>,
        properties: &ProducerProperties,
        native_headers: bool,
    ) -> Self {
        Self {
            destination,
            router,
            header_mode: properties.header_mode(),
            native_headers,
            embedded_names: embedded_names(properties.embedded_headers()),
            content_type: properties.content_type().cloned(),
        }
    }

    /// Turns a message into the record handed to the transport.
    pub(super) fn prepare(&self, message: Message) -> BinderResult<TransportRecord> {
        let partition = self.router.as_ref().map(|router| router.select(&message));
        let (payload, mut headers) = message.into_parts();
        if let Some(content_type) = &self.content_type
            && !headers.contains(CONTENT_TYPE)
        {
            headers.insert(CONTENT_TYPE, content_type.to_string());
        }

        if self.header_mode == HeaderMode::None {
            return self.raw_record(payload, &headers, partition);
        }

        let body = serialize(payload, &mut headers)?;
        let embedded = EmbeddedHeaders::from_message_headers(&headers);
        let record = match (self.header_mode, self.native_headers) {
            (_, true) => TransportRecord {
                payload: body,
                headers: embedded,
                partition,
            },
            (HeaderMode::Embedded, false) => {
                let wire = if self.embedded_names.is_empty() {
                    envelope::encode(&body, &embedded)?
                } else {
                    envelope::encode_selected(&body, &embedded, &self.embedded_names)?
                };
                TransportRecord {
                    payload: wire,
                    headers: EmbeddedHeaders::new(),
                    partition,
                }
            }
            (_, false) => {
                if !headers.is_empty() {
                    warn!(
                        destination = %self.destination,
                        dropped = headers.len(),
                        "transport has no native headers; headers dropped"
                    );
                }
                TransportRecord {
                    payload: body,
                    headers: EmbeddedHeaders::new(),
                    partition,
                }
            }
        };
        Ok(record)
    }

    fn raw_record(
        &self,
        payload: Payload,
        headers: &MessageHeaders,
        partition: Option<u32>,
    ) -> BinderResult<TransportRecord> {
        let bytes = match payload {
            Payload::Bytes(bytes) => bytes,
            other => return Err(BinderError::RawPayloadRequired(other.kind())),
        };
        if let Some(HeaderValue::Text(declared)) = headers.get(CONTENT_TYPE)
            && ContentType::parse(declared).ok() != Some(ContentType::octet_stream())
        {
            error!(
                destination = %self.destination,
                content_type = %declared,
                "raw mode sends bytes only; declared content type is ignored"
            );
        }
        Ok(TransportRecord {
            payload: bytes,
            headers: EmbeddedHeaders::new(),
            partition,
        })
    }
}

/// Embedded header names when only some headers travel: the content type
/// headers always come first, followed by the configured names.
fn embedded_names(configured: &[String]) -> Vec<String> {
    if configured.is_empty() {
        return Vec::new();
    }
    let mut names = vec![CONTENT_TYPE.to_owned(), ORIGINAL_CONTENT_TYPE.to_owned()];
    for name in configured {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    names
}

/// Serializes a typed payload, recording its type in `originalContentType`.
fn serialize(payload: Payload, headers: &mut MessageHeaders) -> BinderResult<Bytes> {
    match payload {
        Payload::Bytes(bytes) => Ok(bytes),
        Payload::Text(text) => {
            headers.insert(ORIGINAL_CONTENT_TYPE, ContentType::text_plain().to_string());
            Ok(Bytes::from(text))
        }
        Payload::Json(document) => {
            let encoded = serde_json::to_vec(&document)
                .map_err(|err| BinderError::Serialization(Arc::new(err)))?;
            headers.insert(
                ORIGINAL_CONTENT_TYPE,
                ContentType::application_json().to_string(),
            );
            Ok(Bytes::from(encoded))
        }
    }
}
