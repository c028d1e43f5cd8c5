//! Port definitions for the binder context.

pub mod handler;
pub mod transport;

pub use handler::{HandlerError, MessageHandler};
pub use transport::{
    RecordSink, Subscription, Transport, TransportEndpoint, TransportError, TransportListener,
    TransportProducer, TransportRecord, TransportResult,
};
