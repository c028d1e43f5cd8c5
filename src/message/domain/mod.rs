//! Domain model for channel messages.
//!
//! Payloads, headers and content types live here. Transport and codec
//! concerns stay outside this boundary.

mod content_type;
mod error;
mod headers;
mod message;

pub use content_type::ContentType;
pub use error::MessageDomainError;
pub use headers::{CONTENT_TYPE, HeaderValue, MessageHeaders, ORIGINAL_CONTENT_TYPE};
pub use message::{Message, Payload};
