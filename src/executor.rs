//! Bounded executor: caps how many submitted work units run at once
//!
//! Each admission takes one slot from a [`Semaphore`] and registers one unit in
//! a [`WaitGroup`], then spawns the work as a detached compio task. When the
//! task finishes (or is dropped by the runtime) the slot is released and the
//! unit retired, in that order.

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;

use compio_sync::{Semaphore, SemaphorePermit, WaitGroup, WaitGuard};
use futures::future::{select, Either};
use tracing::{debug, trace, warn};

use crate::config::ExecutorConfig;
use crate::error::Result;
use crate::signal::CancelSignal;

/// Runs work units concurrently, never more than `capacity` at a time
///
/// Work is admitted through one of three policies:
///
/// - [`add`](Self::add) waits for a slot but gives up when a [`CancelSignal`] fires
/// - [`try_add`](Self::try_add) never waits
/// - [`must_add`](Self::must_add) waits for as long as it takes
///
/// and [`wait`](Self::wait) blocks until every admitted unit has finished.
///
/// Admitted work is fire-and-forget: its output is `()` and anything it needs
/// to report must go through state the caller shares with it. Cloning the
/// executor shares its slots.
///
/// Work passed to `add` or `must_add` must not itself call `add` or `must_add`
/// on the same executor. With every slot held by such work nothing can free one
/// and the chain deadlocks. Calling `try_add` from inside work is fine.
///
/// # Example
///
/// ```rust,no_run
/// use bounded_executor::BoundedExecutor;
///
/// #[compio::main]
/// async fn main() {
///     let executor = BoundedExecutor::new(4);
///
///     for i in 0..100 {
///         executor
///             .must_add(async move {
///                 println!("job {}", i);
///             })
///             .await;
///     }
///
///     executor.wait().await;
/// }
/// ```
#[derive(Clone, Debug)]
pub struct BoundedExecutor {
    slots: Semaphore,
    inflight: WaitGroup,
    name: Arc<str>,
}

/// Snapshot of an executor's occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Configured maximum concurrency
    pub capacity: usize,
    /// Slots free right now
    pub available: usize,
    /// Slots held by admitted work
    pub occupied: usize,
    /// Admitted work units that have not finished
    pub in_flight: usize,
}

/// Cleanup owned by a running work unit
///
/// Field order is drop order: the slot is released before the unit is retired.
struct Completion {
    _slot: SemaphorePermit,
    _inflight: WaitGuard,
    name: Arc<str>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        trace!("Executor '{}': work unit completed", self.name);
    }
}

impl BoundedExecutor {
    /// Create an executor admitting at most `capacity` concurrent work units
    ///
    /// A capacity of zero is accepted and admits nothing: `try_add` always
    /// returns `false`, `add` only returns through its signal, and `must_add`
    /// never completes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_config(ExecutorConfig::new(capacity))
    }

    #[must_use]
    pub fn with_config(config: ExecutorConfig) -> Self {
        if config.capacity == 0 {
            warn!(
                "Executor '{}' created with zero capacity; no work will ever be admitted",
                config.name
            );
        }
        debug!(
            "Created executor '{}' with capacity {}",
            config.name, config.capacity
        );

        Self {
            slots: Semaphore::new(config.capacity),
            inflight: WaitGroup::new(),
            name: config.name.into(),
        }
    }

    /// Admit `work`, waiting for a free slot unless `signal` fires first
    ///
    /// The signal is checked before the slot on every poll, so a signal that
    /// has already fired never admits. When this returns an error the work was
    /// not started and no slot is held.
    ///
    /// # Errors
    ///
    /// Returns the signal's [`CancelError`](crate::CancelError) if it fires
    /// before a slot is acquired.
    ///
    /// # Panics
    ///
    /// Panics if called outside a compio runtime.
    pub async fn add<F>(&self, signal: &CancelSignal, work: F) -> Result<()>
    where
        F: Future<Output = ()> + 'static,
    {
        let cancelled = pin!(signal.cancelled());
        let permit = match select(cancelled, self.slots.acquire()).await {
            Either::Left((err, _)) => {
                debug!("Executor '{}': admission abandoned: {}", self.name, err);
                return Err(err);
            }
            Either::Right((permit, _)) => permit,
        };

        self.start_with_permit(permit, work);
        Ok(())
    }

    /// Admit `work` only if a slot is free right now
    ///
    /// Returns whether the work was started.
    ///
    /// # Panics
    ///
    /// Panics if called outside a compio runtime.
    pub fn try_add<F>(&self, work: F) -> bool
    where
        F: Future<Output = ()> + 'static,
    {
        let Some(permit) = self.slots.try_acquire() else {
            trace!("Executor '{}': no free slot, work rejected", self.name);
            return false;
        };

        self.start_with_permit(permit, work);
        true
    }

    /// Admit `work`, waiting as long as it takes for a free slot
    ///
    /// # Panics
    ///
    /// Panics if called outside a compio runtime.
    pub async fn must_add<F>(&self, work: F)
    where
        F: Future<Output = ()> + 'static,
    {
        let permit = self.slots.acquire().await;
        self.start_with_permit(permit, work);
    }

    /// Wait until no admitted work is outstanding
    ///
    /// Occupancy is re-checked after every wake of the completion barrier, so
    /// an admission racing with the check is waited for rather than missed.
    /// This is best-effort: on return there was some instant after the call
    /// with nothing in flight, but new work may have been admitted since.
    ///
    /// Occupancy and [`in_flight`](Self::in_flight) move in two steps, so an
    /// observer on another thread can briefly see them disagree: between an
    /// admission taking its slot and registering the unit, and between a
    /// finished unit releasing its slot and retiring. They always agree on the
    /// thread that runs the admission or the cleanup.
    pub async fn wait(&self) {
        while self.slots.in_use() > 0 {
            self.inflight.wait().await;
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.max_permits()
    }

    /// Number of slots currently free
    #[must_use]
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Number of slots currently held by admitted work
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.slots.in_use()
    }

    /// Number of admitted work units that have not finished
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inflight.count()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn stats(&self) -> ExecutorStats {
        let available = self.available();
        ExecutorStats {
            capacity: self.capacity(),
            available,
            occupied: self.capacity() - available,
            in_flight: self.in_flight(),
        }
    }

    fn start_with_permit<F>(&self, permit: SemaphorePermit, work: F)
    where
        F: Future<Output = ()> + 'static,
    {
        let completion = Completion {
            _slot: permit,
            _inflight: self.inflight.enter(),
            name: Arc::clone(&self.name),
        };
        trace!(
            "Executor '{}': admitted work ({}/{} slots occupied)",
            self.name,
            self.occupied(),
            self.capacity()
        );

        compio::runtime::spawn(async move {
            let _completion = completion;
            work.await;
        })
        .detach();
    }
}
