//! Binder services: the binder contract, binding handles and the message
//! pipelines between applications and transports.

mod binder;
mod binding;
mod error;
mod inbound;
mod outbound;
mod stream;

pub use binder::{Binder, MessageBinder};
pub use binding::{Binding, ProducerBinding};
pub use error::{BinderError, BinderResult};
pub use stream::ResultStreamAdapter;
