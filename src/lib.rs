//! compio-semaphore: fair and unfair async counting semaphore
//!
//! This crate provides a counting semaphore compatible with the
//! [compio](https://github.com/compio-rs/compio) async runtime, for
//! throttling concurrent operations (e.g. limiting simultaneous network
//! calls) within a single execution context.
//!
//! Unlike a plain permit counter, the semaphore supports:
//!
//! - **fair mode**: contended acquires are granted in strict arrival order
//! - **multi-permit requests**: acquires and releases move any amount at
//!   once, all-or-nothing
//! - **queue positions**: an acquire may ask to be parked ahead of
//!   existing waiters
//! - **pluggable backends**: permit bookkeeping goes through the
//!   [`PermitStore`] trait, with [`LocalStore`] as the in-memory backend
//!
//! # Example
//!
//! ```rust,no_run
//! use compio_semaphore::Semaphore;
//!
//! #[compio::main]
//! async fn main() -> compio_semaphore::Result<()> {
//!     // At most 100 tasks inside the guarded section at once
//!     let sem = Semaphore::new(100);
//!
//!     for i in 0..1000 {
//!         let sem = sem.clone();
//!         compio::runtime::spawn(async move {
//!             sem.acquire(1).await?;
//!             println!("task {i}");
//!             sem.release(1).await
//!         })
//!         .detach();
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod queue;
mod semaphore;
pub mod store;

// Re-export commonly used types
pub use error::{Result, SemaphoreError};
pub use semaphore::{LocalSemaphore, Semaphore, DEFAULT_NAME};
pub use store::{LocalStore, PermitStore};
