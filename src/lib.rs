//! bounded-executor: bounded-concurrency task admission for compio
//!
//! This library caps the number of concurrently running work units at a fixed
//! capacity. Work can be admitted with a cancellable wait, without waiting, or
//! with an unconditional wait, and callers can wait for all admitted work to
//! drain. Slot accounting and the completion barrier come from the
//! `compio-sync` crate in this workspace.

pub mod config;
pub mod error;
pub mod executor;
pub mod signal;

// Re-export commonly used types
pub use config::ExecutorConfig;
pub use error::{CancelError, Result};
pub use executor::{BoundedExecutor, ExecutorStats};
pub use signal::CancelSignal;
pub use tokio_util::sync::CancellationToken;
