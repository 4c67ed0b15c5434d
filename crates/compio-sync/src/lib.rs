//! Async synchronization primitives for compio runtime
//!
//! This crate provides async synchronization primitives that are compatible
//! with the [compio](https://github.com/compio-rs/compio) async runtime.
//!
//! # Primitives
//!
//! - [`Semaphore`] - Async semaphore for bounding concurrency
//! - [`WaitGroup`] - Completion counter that can be awaited until it drains
//!
//! # Example
//!
//! ```rust,no_run
//! use compio_sync::{Semaphore, WaitGroup};
//!
//! #[compio::main]
//! async fn main() {
//!     let sem = Semaphore::new(100);
//!     let wg = WaitGroup::new();
//!
//!     // Spawn many tasks, but only 100 run concurrently
//!     for i in 0..1000 {
//!         let permit = sem.acquire().await;
//!         let guard = wg.enter();
//!         compio::runtime::spawn(async move {
//!             println!("Task {}", i);
//!             drop(permit);
//!             drop(guard);
//!         })
//!         .detach();
//!     }
//!
//!     wg.wait().await;
//! }
//! ```

mod semaphore;
mod wait_group;
mod waiters;

pub use semaphore::{Acquire, Semaphore, SemaphorePermit};
pub use wait_group::{WaitGroup, WaitGuard, WaitGroupFuture};
