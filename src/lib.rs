//! stream-binder: broker-agnostic message channels.
//!
//! Applications send and receive [`message::domain::Message`]s through
//! logical channels. A binder attaches each channel to a destination on a
//! concrete transport, so application code never depends on the broker.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture principles:
//!
//! - **Domain**: pure types and invariants with no infrastructure
//!   dependencies
//! - **Ports**: trait interfaces for transports, registries and factories
//! - **Adapters**: concrete implementations of ports (in-memory, HTTP,
//!   filesystem)
//! - **Services**: orchestration over ports
//!
//! # Modules
//!
//! - [`message`]: message, payload, header and content type model
//! - [`envelope`]: embedded-header wire format
//! - [`partition`]: partition key extraction and selection
//! - [`binder`]: binding lifecycle and message pipelines
//! - [`registry`]: binder discovery and resolution
//! - [`schema`]: schema registry clients and the Avro payload codec

pub mod binder;
pub mod envelope;
pub mod message;
pub mod partition;
pub mod registry;
pub mod schema;
