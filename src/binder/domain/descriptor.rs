//! Binding descriptor aggregate.

use super::{BinderDomainError, BindingId, BindingState, ConsumerGroup, DestinationName};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a binding publishes or consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingDirection {
    /// Outbound binding.
    Producer,
    /// Inbound binding.
    Consumer,
}

impl BindingDirection {
    /// Returns the canonical text representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Consumer => "consumer",
        }
    }
}

impl fmt::Display for BindingDirection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Identity and lifecycle state of one binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingDescriptor {
    id: BindingId,
    destination: DestinationName,
    group: Option<ConsumerGroup>,
    direction: BindingDirection,
    state: BindingState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BindingDescriptor {
    /// Creates a producer descriptor in the provisioning state.
    #[must_use]
    pub fn producer(destination: DestinationName, clock: &impl Clock) -> Self {
        Self::new(destination, None, BindingDirection::Producer, clock)
    }

    /// Creates a consumer descriptor in the provisioning state.
    ///
    /// A `None` group denotes an anonymous consumer.
    #[must_use]
    pub fn consumer(
        destination: DestinationName,
        group: Option<ConsumerGroup>,
        clock: &impl Clock,
    ) -> Self {
        Self::new(destination, group, BindingDirection::Consumer, clock)
    }

    fn new(
        destination: DestinationName,
        group: Option<ConsumerGroup>,
        direction: BindingDirection,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: BindingId::new(),
            destination,
            group,
            direction,
            state: BindingState::Provisioning,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns the binding identifier.
    #[must_use]
    pub const fn id(&self) -> BindingId {
        self.id
    }

    /// Returns the bound destination.
    #[must_use]
    pub const fn destination(&self) -> &DestinationName {
        &self.destination
    }

    /// Returns the consumer group, if any.
    #[must_use]
    pub const fn group(&self) -> Option<&ConsumerGroup> {
        self.group.as_ref()
    }

    /// Returns the binding direction.
    #[must_use]
    pub const fn direction(&self) -> BindingDirection {
        self.direction
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> BindingState {
        self.state
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Moves a provisioned binding to `active`.
    ///
    /// # Errors
    ///
    /// Returns [`BinderDomainError::InvalidLifecycleTransition`] when the
    /// binding is not provisioning.
    pub fn mark_active(&mut self, clock: &impl Clock) -> Result<(), BinderDomainError> {
        self.transition_to(BindingState::Active, clock)
    }

    /// Moves an active binding to `stopping`.
    ///
    /// # Errors
    ///
    /// Returns [`BinderDomainError::InvalidLifecycleTransition`] when the
    /// binding is not active.
    pub fn mark_stopping(&mut self, clock: &impl Clock) -> Result<(), BinderDomainError> {
        self.transition_to(BindingState::Stopping, clock)
    }

    /// Moves a stopping binding to `stopped`.
    ///
    /// # Errors
    ///
    /// Returns [`BinderDomainError::InvalidLifecycleTransition`] when the
    /// binding is not stopping.
    pub fn mark_stopped(&mut self, clock: &impl Clock) -> Result<(), BinderDomainError> {
        self.transition_to(BindingState::Stopped, clock)
    }

    /// Moves the binding to `failed`.
    ///
    /// # Errors
    ///
    /// Returns [`BinderDomainError::InvalidLifecycleTransition`] when the
    /// binding already reached a terminal state.
    pub fn mark_failed(&mut self, clock: &impl Clock) -> Result<(), BinderDomainError> {
        self.transition_to(BindingState::Failed, clock)
    }

    fn transition_to(
        &mut self,
        target_state: BindingState,
        clock: &impl Clock,
    ) -> Result<(), BinderDomainError> {
        if !self.state.can_transition_to(target_state) {
            return Err(BinderDomainError::InvalidLifecycleTransition {
                from: self.state.as_str().to_owned(),
                to: target_state.as_str().to_owned(),
            });
        }

        self.state = target_state;
        self.updated_at = clock.utc();
        Ok(())
    }
}
