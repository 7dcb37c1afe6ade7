//! Error types for workflow state handling.

use thiserror::Error;

/// Result type alias for workflow state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors raised while decoding, encoding or reading workflow state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("event carries no notification record")]
    EmptyEvent,

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("workflow state is missing `{0}`")]
    Missing(&'static str),
}
