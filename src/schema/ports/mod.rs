//! Port contracts for schema registries and the HTTP transport they use.

pub mod http;
pub mod registry;

pub use http::{HttpJsonClient, HttpJsonResponse, RequestHeaders};
pub use registry::{SchemaRegistryClient, SchemaRegistryError, SchemaRegistryResult};
