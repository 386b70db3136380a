//! Error taxonomy for engine queries and aggregation passes

use std::time::Duration;
use thiserror::Error;

/// Failure of a single engine query
#[derive(Debug, Error)]
pub enum EngineError {
    /// Transport-level failure reaching the engine (socket, process spawn)
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// Engine answered with a non-success status or an unparsable body
    #[error("engine protocol error: {0}")]
    Protocol(String),

    /// Inspect target no longer exists
    #[error("container not found: {0}")]
    NotFound(String),

    /// The engine did not answer within the configured timeout
    #[error("engine query timed out after {0:?}")]
    Timeout(Duration),
}

impl EngineError {
    /// Returns true for failures where the engine could not be reached at all
    pub fn is_transport(&self) -> bool {
        matches!(self, EngineError::Unavailable(_) | EngineError::Timeout(_))
    }
}

/// Failure of a whole aggregation pass
#[derive(Debug, Error)]
pub enum AggregationError {
    /// The list step failed; no report is produced
    #[error("failed to list containers: {0}")]
    ListFailed(#[source] EngineError),
}
