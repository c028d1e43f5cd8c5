//! Binder bounded context.
//!
//! A binder attaches logical channels to destinations on a concrete
//! transport. Producer bindings run messages through partition routing,
//! payload serialization and header embedding before handing bytes to the
//! transport; consumer bindings reverse those steps and feed a
//! [`ports::MessageHandler`].
//!
//! - [`domain`]: binding descriptors, lifecycle states and properties
//! - [`ports`]: the transport and handler contracts
//! - [`adapters`]: the in-memory transport
//! - [`services`]: the [`services::Binder`] trait and its shared
//!   implementation

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
