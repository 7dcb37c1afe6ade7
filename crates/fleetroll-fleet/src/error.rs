//! Error types for fleet collaborators.

use thiserror::Error;

use fleetroll_state::StateError;

use crate::api::ApiError;

/// Result type alias for fleet operations.
pub type FleetResult<T> = Result<T, FleetError>;

/// Errors surfaced by the fleet components.
#[derive(Debug, Error)]
pub enum FleetError {
    /// The group name did not resolve to exactly one group.
    #[error("group {group:?} resolved to {found} groups, expected exactly 1")]
    Lookup { group: String, found: usize },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    State(#[from] StateError),
}
