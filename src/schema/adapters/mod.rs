//! Schema registry adapters.
//!
//! - [`memory::InMemorySchemaRegistry`]: process-local registry for tests and
//!   single-process deployments
//! - [`http::DefaultSchemaRegistryClient`]: the stream schema server protocol
//! - [`http::ConfluentSchemaRegistryClient`]: the Confluent registry protocol
//! - [`http::ReqwestHttpClient`]: production [`HttpJsonClient`] transport
//!
//! [`HttpJsonClient`]: crate::schema::ports::HttpJsonClient

pub mod http;
pub mod memory;

pub use http::{ConfluentSchemaRegistryClient, DefaultSchemaRegistryClient, ReqwestHttpClient};
pub use memory::InMemorySchemaRegistry;
