use thiserror::Error;

use crate::password::HashError;
use crate::store::StoreError;

/// Failure kinds returned by the identity, guard and mutation layers.
///
/// Status codes are assigned only at the HTTP boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthenticated(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Conflict(String),
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
    #[error("password hashing failure: {0}")]
    Hash(#[from] HashError),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidInput(message.into())
    }

    /// True for failures caused by the server rather than the request.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AppError::Store(_) | AppError::Hash(_) | AppError::Task(_)
        )
    }
}
