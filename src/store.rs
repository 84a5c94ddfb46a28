//! Permit bookkeeping backends
//!
//! The [`PermitStore`] trait is the capability boundary between the
//! acquisition logic in [`Semaphore`](crate::Semaphore) and the storage of
//! the permit count itself. The only concrete backend in this crate is
//! [`LocalStore`], which keeps the count in process memory; a store backed
//! by an external resource (shared memory, a coordination service) can be
//! substituted without touching the fairness logic, which is why both
//! operations are async and fallible even though the local versions are
//! neither.

use crate::error::Result;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

/// Capability contract for permit bookkeeping
///
/// Both operations must be all-or-nothing: a grant either takes the full
/// requested amount or leaves the count untouched.
pub trait PermitStore {
    /// Attempt to take `permits` from the available pool
    ///
    /// Resolves `Ok(true)` and decrements the count when enough permits are
    /// available, `Ok(false)` without any mutation otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing resource fails. [`LocalStore`]
    /// never does.
    fn grant(&self, permits: usize) -> impl Future<Output = Result<bool>>;

    /// Return `permits` to the available pool
    ///
    /// Resolves `Ok(true)` on success. The amount is added unconditionally;
    /// stores are not required to cap the count at any configured total.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing resource fails. [`LocalStore`]
    /// never does.
    fn restore(&self, permits: usize) -> impl Future<Output = Result<bool>>;
}

/// Process-local permit store
///
/// Holds the permit count for a single in-memory semaphore. `total` is
/// fixed at construction; `available` moves with grants and restores.
/// Restores are unclamped, so `available` can exceed `total` when more is
/// released than was ever acquired (borrow semantics, see
/// [`Semaphore::release`](crate::Semaphore::release)).
#[derive(Debug)]
pub struct LocalStore {
    /// Configured capacity, immutable after construction
    total: usize,
    /// Currently available permits
    available: Mutex<usize>,
}

impl LocalStore {
    /// Create a store with `permits` available
    #[must_use]
    pub fn new(permits: usize) -> Self {
        Self {
            total: permits,
            available: Mutex::new(permits),
        }
    }

    /// Configured capacity
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Currently available permits
    ///
    /// Snapshot only; the value may change as soon as it is read.
    #[must_use]
    pub fn available(&self) -> usize {
        *self.available.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PermitStore for LocalStore {
    async fn grant(&self, permits: usize) -> Result<bool> {
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        if *available >= permits {
            *available -= permits;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn restore(&self, permits: usize) -> Result<bool> {
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        *available += permits;
        Ok(true)
    }
}
