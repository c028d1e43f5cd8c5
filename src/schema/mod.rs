//! Schema registry client and schema-aware Avro payload codec.
//!
//! Producers and consumers exchange Avro payloads whose writer schema is
//! named by a [`domain::SchemaReference`] carried in the message content
//! type (`application/vnd.<subject>.v<version>+avro`). The registry assigns
//! versions; the codec negotiates, registers and resolves schemas through it.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Registry adapters in [`adapters`]
//! - Caching decorator and payload codec in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
