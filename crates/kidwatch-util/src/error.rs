//! Error types for kidwatch

use thiserror::Error;

use crate::ChildId;

/// Core error type for kidwatch operations
#[derive(Debug, Error)]
pub enum KidwatchError {
    #[error("Child not found: {0}")]
    ChildNotFound(ChildId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KidwatchError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type KidwatchResult<T> = std::result::Result<T, KidwatchError>;
