//! Collaborator traits the controller is built against.

use crate::error::{CapacityError, StoreError};
use crate::session::Session;
use crate::types::CapacityInput;

/// Supplies the battery capacity for the current device.
pub trait CapacityProvider {
    fn capacity(&self) -> Result<CapacityInput, CapacityError>;
}

/// Durable home for finished sessions.
pub trait SessionStore {
    /// Persists a finalized session.
    fn save_session(&mut self, session: &Session) -> Result<(), StoreError>;

    /// Records charger label or notes changes on the open session.
    fn annotate_session(&mut self, session: &Session) -> Result<(), StoreError>;
}

/// Capacity fixed at construction, used for manual overrides and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedCapacity(pub CapacityInput);

impl CapacityProvider for FixedCapacity {
    fn capacity(&self) -> Result<CapacityInput, CapacityError> {
        Ok(self.0)
    }
}

/// Store that accepts and discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl SessionStore for NullStore {
    fn save_session(&mut self, _session: &Session) -> Result<(), StoreError> {
        Ok(())
    }

    fn annotate_session(&mut self, _session: &Session) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Asks the provider for a capacity, degrading to the fallback constant.
///
/// The second value is the provider error when the fallback was used.
pub fn resolve_capacity<P: CapacityProvider + ?Sized>(
    provider: &P,
) -> (CapacityInput, Option<CapacityError>) {
    match provider.capacity() {
        Ok(capacity) => (capacity, None),
        Err(e) => (CapacityInput::fallback(), Some(e)),
    }
}

impl<T: CapacityProvider + ?Sized> CapacityProvider for Box<T> {
    fn capacity(&self) -> Result<CapacityInput, CapacityError> {
        (**self).capacity()
    }
}

impl<T: SessionStore + ?Sized> SessionStore for Box<T> {
    fn save_session(&mut self, session: &Session) -> Result<(), StoreError> {
        (**self).save_session(session)
    }

    fn annotate_session(&mut self, session: &Session) -> Result<(), StoreError> {
        (**self).annotate_session(session)
    }
}
