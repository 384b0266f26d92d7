//! Error types for claimq.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("work item not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid collection name: {0:?}")]
    InvalidCollection(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("translation failed: {0}")]
    Translation(String),

    #[error("handler failed: {0}")]
    Handler(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Transient faults are retried on the next tick; everything else is a bug
    /// or a bootstrap problem.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Io(_) | Error::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Run `fut` under a deadline, mapping expiry to [`Error::Timeout`].
pub async fn with_timeout<T, F>(operation: &'static str, after: Duration, fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout { operation, after }),
    }
}
