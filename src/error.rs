use thiserror::Error;

use crate::{dao::storage::StorageError, state::state_machine::InvalidTransition};

/// Errors that can occur in service layer operations.
///
/// Most user-reachable conditions in this crate are deliberately not errors:
/// they degrade to logged no-ops plus haptic feedback. `ServiceError` covers
/// the explicit persistence paths (`flush`) and internal transition plumbing.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable or a blob could not be written.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}
