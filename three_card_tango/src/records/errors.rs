use thiserror::Error;

use crate::game::entities::{GameId, HandId};

/// Hand record errors
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("game {0} not found")]
    GameNotFound(GameId),

    #[error("hand {0} not found")]
    HandNotFound(HandId),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for hand record operations
pub type RecordResult<T> = Result<T, RecordError>;
