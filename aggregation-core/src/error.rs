// aggregation-core/src/error.rs
// Error type shared by every stage builder

use thiserror::Error;

/// Errors raised while building or serializing an aggregation pipeline
#[derive(Debug, Error)]
pub enum AggregationError {
    /// A builder was handed an argument it cannot accept (blank field, empty pipeline, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AggregationError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        AggregationError::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AggregationError>;
