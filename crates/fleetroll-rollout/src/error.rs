//! Error types for the rolling-update state machine.

use thiserror::Error;

use fleetroll_fleet::{ApiError, FleetError};
use fleetroll_state::StateError;

/// Result type alias for rolling-update operations.
pub type RollResult<T> = Result<T, RollError>;

/// Faults that abort an invocation. No continuation is published and
/// nothing already done is rolled back.
#[derive(Debug, Error)]
pub enum RollError {
    /// Configuration error: the group is missing or ambiguous.
    #[error("group {group:?} resolved to {found} groups, expected exactly 1")]
    Lookup { group: String, found: usize },

    /// A fleet or bus call failed. Recovery is redelivery of the same state.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The trigger or the state it carries could not be used.
    #[error("malformed trigger: {0}")]
    Event(#[from] StateError),

    /// A live continuation was published but never reached the bus.
    #[error("continuation for {group:?} was not delivered")]
    Undelivered { group: String },
}

impl From<FleetError> for RollError {
    fn from(err: FleetError) -> Self {
        match err {
            FleetError::Lookup { group, found } => RollError::Lookup { group, found },
            FleetError::Api(e) => RollError::Api(e),
            FleetError::State(e) => RollError::Event(e),
        }
    }
}
