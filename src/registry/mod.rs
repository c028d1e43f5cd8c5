//! Binder discovery and resolution.
//!
//! Transport modules declare binder types in manifest resources and
//! register their factories in a [`services::BinderTypeTable`] at startup.
//! The [`services::BinderRegistry`] resolves configuration names to binder
//! instances, creating each on first use and closing them all on shutdown.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Manifest locators and the in-memory factory in [`adapters`]
//! - Resolution and channel binding in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
