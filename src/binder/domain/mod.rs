//! Domain model for bindings.

mod descriptor;
mod error;
mod event;
mod ids;
mod properties;
mod state;

pub use descriptor::{BindingDescriptor, BindingDirection};
pub use error::{BinderDomainError, ParseBindingStateError};
pub use event::BinderEvent;
pub use ids::{BindingId, ConsumerGroup, DestinationName};
pub use properties::{
    ConsumerProperties, HeaderMode, MalformedEnvelopePolicy, ProducerProperties, PropertyBag,
    RetryPolicy,
};
pub use state::BindingState;
