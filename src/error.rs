//! Error handling and types

use thiserror::Error;

/// Semaphore operation errors
///
/// Insufficient permits are not an error: a grant attempt that cannot be
/// honored reports `false` through the normal return value. Errors are
/// reserved for a failing permit store and for operations against a
/// semaphore that has been shut down.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemaphoreError {
    /// The backing permit store failed while granting or restoring permits
    #[error("permit store failure: {0}")]
    Store(String),

    /// The semaphore was closed while the request was queued or in flight
    #[error("semaphore closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, SemaphoreError>;
