//! Adapter implementations for the binder transport port.

pub mod memory;

pub use memory::InMemoryTransport;
