//! Counting semaphore with fair and unfair acquisition
//!
//! The semaphore limits how many permits are out at once; callers that ask
//! for more than is available are parked in a wait queue until releases
//! make enough room. Two acquisition policies are supported:
//!
//! - **unfair** (default): `acquire` tries for an immediate grant and only
//!   queues on insufficiency. New arrivals can overtake parked waiters.
//! - **fair**: every `acquire` goes through the wait queue, so grants
//!   happen strictly in arrival order (unless a caller asks for an
//!   explicit queue position via [`Semaphore::acquire_at`]).
//!
//! Permit bookkeeping is delegated to a [`PermitStore`], so the same
//! acquisition logic can run against a backend other than process memory.
//!
//! # Example
//!
//! ```rust,no_run
//! use compio_semaphore::Semaphore;
//!
//! # async fn example() -> compio_semaphore::Result<()> {
//! // At most 8 concurrent holders
//! let sem = Semaphore::new(8);
//!
//! sem.acquire(1).await?;
//! // ... do the bounded work ...
//! sem.release(1).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, SemaphoreError};
use crate::queue::{WaitQueue, Waiter};
use crate::store::{LocalStore, PermitStore};
use futures::channel::oneshot;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Name given to semaphores constructed without an explicit one
pub const DEFAULT_NAME: &str = "default";

/// Sleep between grant attempts in [`Semaphore::try_acquire_for`], so the
/// polling loop yields instead of spinning on the scheduler
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A counting semaphore over a pluggable [`PermitStore`]
///
/// Cheap to clone; all clones share the same permit count and wait queue.
/// The common process-local variant is [`LocalSemaphore`], built with
/// [`Semaphore::new`] or [`Semaphore::new_fair`].
///
/// Acquires resolve to `Ok(true)` once granted. The boolean mirrors
/// [`Semaphore::try_acquire`], which is the only path that can resolve
/// `Ok(false)`; plain `acquire` either succeeds or stays pending.
///
/// # Example
///
/// ```rust,no_run
/// use compio_semaphore::Semaphore;
///
/// # async fn example() -> compio_semaphore::Result<()> {
/// let sem = Semaphore::new(2);
/// let worker = sem.clone();
///
/// compio::runtime::spawn(async move {
///     worker.acquire(1).await?;
///     // ... at most two tasks get here concurrently ...
///     worker.release(1).await
/// })
/// .detach();
/// # Ok(())
/// # }
/// ```
pub struct Semaphore<S> {
    inner: Arc<Inner<S>>,
}

/// Process-local semaphore, the one concrete backend in this crate
pub type LocalSemaphore = Semaphore<LocalStore>;

struct Inner<S> {
    /// Identifying label only; no runtime behavior
    name: String,
    /// Acquisition policy, immutable after construction
    fair: bool,
    /// Set once by `close`; all later operations fail fast
    closed: AtomicBool,
    store: S,
    waiters: Mutex<WaitQueue>,
}

impl<S> Clone for Semaphore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Semaphore<LocalStore> {
    /// Create an unfair process-local semaphore with `permits` capacity
    ///
    /// A capacity of zero is allowed: every acquire then waits until a
    /// release lends permits into the pool.
    #[must_use]
    pub fn new(permits: usize) -> Self {
        Self::with_store(LocalStore::new(permits), DEFAULT_NAME, false)
    }

    /// Create a fair process-local semaphore with `permits` capacity
    #[must_use]
    pub fn new_fair(permits: usize) -> Self {
        Self::with_store(LocalStore::new(permits), DEFAULT_NAME, true)
    }

    /// Configured capacity
    #[must_use]
    pub fn total_permits(&self) -> usize {
        self.inner.store.total()
    }

    /// Currently available permits
    ///
    /// Snapshot for monitoring and tests; the value may change as soon as
    /// it is read. Can exceed [`Semaphore::total_permits`] after an
    /// over-release, see [`Semaphore::release`].
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.inner.store.available()
    }
}

impl<S: PermitStore> Semaphore<S> {
    /// Create a semaphore over a custom permit store
    pub fn with_store(store: S, name: impl Into<String>, fair: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                fair,
                closed: AtomicBool::new(false),
                store,
                waiters: Mutex::new(WaitQueue::new()),
            }),
        }
    }

    /// Acquire `permits`, waiting until enough are available
    ///
    /// In unfair mode this first tries an immediate grant and only joins
    /// the wait queue on insufficiency; in fair mode the request always
    /// joins the queue and is granted in queue order. Resolves `Ok(true)`
    /// once the permits are held; there is no timeout and no cancellation,
    /// only [`Semaphore::close`] resolves a parked request early (with an
    /// error).
    ///
    /// # Errors
    ///
    /// - [`SemaphoreError::Store`] if the store fails the immediate grant
    ///   attempt (the request is dropped, never queued) or a drain-time
    ///   grant attempt for this request
    /// - [`SemaphoreError::Closed`] if the semaphore is, or becomes,
    ///   closed
    pub async fn acquire(&self, permits: usize) -> Result<bool> {
        self.acquire_inner(permits, None).await
    }

    /// Acquire `permits`, joining the wait queue at `position` if parked
    ///
    /// A deliberate priority override: position `0` puts the request ahead
    /// of every parked waiter. Positions beyond the current queue length
    /// fall back to the tail, identical to [`Semaphore::acquire`].
    ///
    /// # Errors
    ///
    /// Same as [`Semaphore::acquire`].
    pub async fn acquire_at(&self, permits: usize, position: usize) -> Result<bool> {
        self.acquire_inner(permits, Some(position)).await
    }

    async fn acquire_inner(&self, permits: usize, position: Option<usize>) -> Result<bool> {
        self.check_open()?;

        if self.inner.fair {
            // Fair: always queue, then run one drain step so an
            // uncontended request is granted right away (possibly an
            // older waiter's, not ours).
            let rx = self.enqueue(permits, position);
            self.drain_one().await;
            Self::await_outcome(rx).await
        } else {
            match self.inner.store.grant(permits).await {
                Ok(true) => {
                    trace!(name = %self.inner.name, permits, "granted immediately");
                    Ok(true)
                }
                Ok(false) => {
                    // Insufficient permits: park until a release drains us.
                    let rx = self.enqueue(permits, position);
                    Self::await_outcome(rx).await
                }
                Err(err) => Err(err),
            }
        }
    }

    /// Try to acquire `permits` with a single immediate grant attempt
    ///
    /// Never touches the wait queue: `Ok(false)` means the caller is on
    /// its own to retry, no request is left behind. Because of that, a
    /// `try_acquire` can overtake parked fair-mode waiters.
    ///
    /// # Errors
    ///
    /// [`SemaphoreError::Store`] if the store fails, or
    /// [`SemaphoreError::Closed`] if the semaphore is closed.
    pub async fn try_acquire(&self, permits: usize) -> Result<bool> {
        self.check_open()?;
        self.inner.store.grant(permits).await
    }

    /// Try to acquire `permits`, polling until `timeout` has elapsed
    ///
    /// Repeats immediate grant attempts (with a short sleep in between to
    /// avoid spinning) until one succeeds or the deadline passes; the last
    /// attempt's outcome is returned, so `Ok(false)` is only ever reported
    /// after at least `timeout` has elapsed. A zero `timeout` degenerates
    /// to a single attempt, exactly [`Semaphore::try_acquire`].
    ///
    /// Like `try_acquire`, this path bypasses the wait queue entirely and
    /// can overtake parked waiters during its polling window.
    ///
    /// # Errors
    ///
    /// [`SemaphoreError::Store`] aborts the polling loop immediately;
    /// [`SemaphoreError::Closed`] if the semaphore is closed.
    pub async fn try_acquire_for(&self, permits: usize, timeout: Duration) -> Result<bool> {
        self.check_open()?;

        if timeout.is_zero() {
            return self.inner.store.grant(permits).await;
        }

        let deadline = Instant::now() + timeout;
        loop {
            if self.inner.store.grant(permits).await? {
                return Ok(true);
            }
            if Instant::now() > deadline {
                trace!(name = %self.inner.name, permits, ?timeout, "timed acquire expired");
                return Ok(false);
            }
            compio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Return `permits` to the pool and wake at most one parked waiter
    ///
    /// The restore is unclamped: releasing more than was acquired pushes
    /// the available count past the configured capacity ("borrowed"
    /// permits stay lent out until acquired again).
    ///
    /// **Exactly one waiter is processed per release.** Even if the
    /// release frees enough permits for several parked requests, only the
    /// head of the queue is re-attempted; everyone behind it waits for a
    /// further `release` call. A workload whose releases are small
    /// relative to demand can therefore look "stuck" while being merely
    /// under-released — this is the intended draining contract, not a bug.
    ///
    /// # Errors
    ///
    /// [`SemaphoreError::Store`] if the restore fails (the drain step is
    /// then skipped); [`SemaphoreError::Closed`] if the semaphore is
    /// closed.
    pub async fn release(&self, permits: usize) -> Result<bool> {
        self.check_open()?;
        self.inner.store.restore(permits).await?;
        trace!(name = %self.inner.name, permits, "permits restored");
        self.drain_one().await;
        Ok(true)
    }

    /// Shut the semaphore down, rejecting every parked waiter
    ///
    /// Without this, waiters on a semaphore that is simply dropped are
    /// never resolved. Every queued request completes with
    /// [`SemaphoreError::Closed`], and all subsequent operations fail fast
    /// with the same error. Idempotent.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let abandoned = self.lock_waiters().drain_all();
        if !abandoned.is_empty() {
            debug!(
                name = %self.inner.name,
                waiters = abandoned.len(),
                "rejecting pending waiters on close"
            );
        }
        for waiter in abandoned {
            waiter.complete(Err(SemaphoreError::Closed));
        }
    }

    /// Whether [`Semaphore::close`] has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Number of requests currently parked in the wait queue
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.lock_waiters().len()
    }

    /// Identifying label given at construction
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether this semaphore grants in strict queue order
    #[must_use]
    pub fn is_fair(&self) -> bool {
        self.inner.fair
    }

    /// Run one step of the queue drain: re-attempt a grant for the head
    /// waiter only. An unsatisfied waiter goes back to the head of the
    /// queue; a store failure rejects it and leaves the rest untouched.
    async fn drain_one(&self) {
        let waiter = self.lock_waiters().pop_front();
        let Some(waiter) = waiter else { return };

        match self.inner.store.grant(waiter.permits).await {
            Ok(true) => {
                trace!(name = %self.inner.name, permits = waiter.permits, "waiter granted");
                waiter.complete(Ok(true));
            }
            Ok(false) => {
                self.lock_waiters().push_front(waiter);
            }
            Err(err) => {
                warn!(
                    name = %self.inner.name,
                    permits = waiter.permits,
                    %err,
                    "store failed during drain, rejecting waiter"
                );
                waiter.complete(Err(err));
            }
        }
    }

    fn enqueue(&self, permits: usize, position: Option<usize>) -> oneshot::Receiver<Result<bool>> {
        let (waiter, rx) = Waiter::new(permits);
        let mut queue = self.lock_waiters();
        queue.insert(waiter, position);
        trace!(
            name = %self.inner.name,
            permits,
            queued = queue.len(),
            "request parked"
        );
        rx
    }

    async fn await_outcome(rx: oneshot::Receiver<Result<bool>>) -> Result<bool> {
        match rx.await {
            Ok(outcome) => outcome,
            // Sender dropped without completing: the semaphore state went
            // away while we were parked.
            Err(oneshot::Canceled) => Err(SemaphoreError::Closed),
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(SemaphoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn lock_waiters(&self) -> MutexGuard<'_, WaitQueue> {
        self.inner
            .waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
