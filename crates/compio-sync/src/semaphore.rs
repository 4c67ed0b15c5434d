//! Async semaphore for compio runtime
//!
//! Provides a semaphore primitive compatible with compio's async runtime to limit
//! concurrent operations. Acquisition can block, fail fast, or be abandoned midway
//! (for example when raced against a cancellation signal) without leaking permits
//! or wakeups.
//!
//! # Example
//!
//! ```rust,no_run
//! use compio_sync::Semaphore;
//!
//! # async fn example() {
//! // Create semaphore with 1024 permits
//! let semaphore = Semaphore::new(1024);
//!
//! // Acquire permit before starting work
//! let permit = semaphore.acquire().await;
//!
//! // Do work while holding permit
//! // ...
//!
//! // Permit automatically released when dropped
//! drop(permit);
//! # }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

/// A compio-compatible async semaphore for bounding concurrency
///
/// The semaphore maintains a fixed number of permits that must be acquired
/// before performing an operation. When all permits are in use, `acquire()`
/// will wait asynchronously until a permit becomes available.
///
/// # Design
///
/// - **Lock-free fast path**: Uses atomics for acquiring/releasing when permits available
/// - **FIFO waiters**: Blocked tasks are woken in order; the fast path may still barge
/// - **Cancel-safe acquire**: Dropping a pending [`Acquire`] removes its queue entry,
///   or hands its wakeup on to the next waiter if it had already been woken
/// - **RAII permits**: `SemaphorePermit` automatically releases on drop
/// - **Cloneable**: Clones share the same permit pool
///
/// A semaphore with zero permits is legal: `try_acquire` always fails and
/// `acquire` never completes.
#[derive(Clone)]
pub struct Semaphore {
    /// Shared state between all clones of this semaphore
    inner: Arc<SemaphoreInner>,
}

/// Internal shared state for the semaphore
struct SemaphoreInner {
    /// Available permits (atomic for lock-free operations)
    permits: AtomicUsize,
    /// Maximum permits, fixed at construction
    max_permits: usize,
    /// Queue of tasks waiting for permits
    waiters: Mutex<WaiterQueue>,
}

/// FIFO of parked acquirers, keyed so an abandoned acquire can find its entry
#[derive(Default)]
struct WaiterQueue {
    entries: VecDeque<(u64, Waker)>,
    next_id: u64,
}

impl Semaphore {
    /// Create a new semaphore with the given number of permits
    ///
    /// # Example
    ///
    /// ```rust
    /// use compio_sync::Semaphore;
    ///
    /// let sem = Semaphore::new(1024);
    /// assert_eq!(sem.available_permits(), 1024);
    /// ```
    #[must_use]
    pub fn new(permits: usize) -> Self {
        Self {
            inner: Arc::new(SemaphoreInner {
                permits: AtomicUsize::new(permits),
                max_permits: permits,
                waiters: Mutex::new(WaiterQueue::default()),
            }),
        }
    }

    /// Acquire a permit, waiting asynchronously if none are available
    ///
    /// The returned future resolves to a `SemaphorePermit` that releases the
    /// permit when dropped. Dropping the future before it resolves gives up the
    /// place in the queue and never consumes a permit.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use compio_sync::Semaphore;
    ///
    /// # async fn example() {
    /// let sem = Semaphore::new(10);
    ///
    /// let permit = sem.acquire().await;
    /// // Do work...
    /// drop(permit);  // Release permit
    /// # }
    /// ```
    #[must_use = "futures do nothing unless polled"]
    pub fn acquire(&self) -> Acquire {
        Acquire {
            semaphore: self.clone(),
            waiter: None,
        }
    }

    /// Try to acquire a permit without waiting
    ///
    /// Returns `Some(SemaphorePermit)` if a permit was immediately available,
    /// or `None` if all permits are currently in use.
    ///
    /// # Example
    ///
    /// ```rust
    /// use compio_sync::Semaphore;
    ///
    /// let sem = Semaphore::new(1);
    ///
    /// let permit1 = sem.try_acquire();
    /// assert!(permit1.is_some());
    ///
    /// let permit2 = sem.try_acquire();
    /// assert!(permit2.is_none());  // No permits left
    /// ```
    #[must_use]
    pub fn try_acquire(&self) -> Option<SemaphorePermit> {
        let mut current = self.inner.permits.load(Ordering::Acquire);

        loop {
            if current == 0 {
                return None;
            }

            match self.inner.permits.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Some(SemaphorePermit {
                        semaphore: self.clone(),
                    })
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Get the number of available permits
    ///
    /// This is useful for monitoring and debugging but should not be used
    /// for making decisions (value may change immediately after reading).
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.inner.permits.load(Ordering::Acquire)
    }

    /// Get the maximum number of permits (configured limit)
    #[must_use]
    pub fn max_permits(&self) -> usize {
        self.inner.max_permits
    }

    /// Get the number of permits currently in use (max - available)
    ///
    /// # Example
    ///
    /// ```rust
    /// use compio_sync::Semaphore;
    ///
    /// let sem = Semaphore::new(100);
    /// let _permit = sem.try_acquire().unwrap();
    /// assert_eq!(sem.in_use(), 1);
    /// ```
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.inner.max_permits - self.available_permits()
    }

    /// Release a permit (called internally by `SemaphorePermit::drop`)
    fn release(&self) {
        self.inner.permits.fetch_add(1, Ordering::Release);
        self.wake_one();
    }

    fn waiters(&self) -> MutexGuard<'_, WaiterQueue> {
        self.inner
            .waiters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Pop the oldest waiter and wake it outside the lock
    fn wake_one(&self) {
        let next = self.waiters().entries.pop_front();
        if let Some((_, waker)) = next {
            waker.wake();
        }
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("available_permits", &self.available_permits())
            .field("max_permits", &self.max_permits())
            .finish()
    }
}

/// RAII guard that releases a semaphore permit on drop
///
/// This guard is returned by `Semaphore::acquire()` and `Semaphore::try_acquire()`.
/// When dropped, it automatically releases the permit back to the semaphore and
/// wakes one waiting task (if any).
#[derive(Debug)]
pub struct SemaphorePermit {
    /// Reference to the semaphore that issued this permit
    semaphore: Semaphore,
}

impl Drop for SemaphorePermit {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

/// Future that resolves when a semaphore permit is acquired
///
/// This future is returned by `Semaphore::acquire()`. It will:
/// 1. Try the fast path (atomic decrement if permits available)
/// 2. If no permits, register the task's waker and return `Poll::Pending`
/// 3. When a permit is released, the waker is called and the future retries
///
/// If it is dropped while queued, its entry is removed. If it is dropped after
/// being woken but before it took a permit, the wakeup is passed to the next
/// waiter so no parked task is stranded.
#[derive(Debug)]
pub struct Acquire {
    /// The semaphore from which to acquire a permit
    semaphore: Semaphore,
    /// Queue entry id while registered
    waiter: Option<u64>,
}

impl Acquire {
    /// Insert or refresh this future's queue entry
    fn register(&mut self, waker: &Waker) {
        let mut queue = self.semaphore.waiters();

        if let Some(id) = self.waiter {
            if let Some((_, queued)) = queue.entries.iter_mut().find(|(i, _)| *i == id) {
                if !queued.will_wake(waker) {
                    queued.clone_from(waker);
                }
                return;
            }
        }

        let id = queue.next_id;
        queue.next_id = queue.next_id.wrapping_add(1);
        queue.entries.push_back((id, waker.clone()));
        self.waiter = Some(id);
    }

    /// Remove this future's queue entry
    ///
    /// Returns `false` when the entry had already been popped by a release,
    /// i.e. this future consumed a wakeup.
    fn deregister(&mut self) -> bool {
        let Some(id) = self.waiter.take() else {
            return true;
        };
        let mut queue = self.semaphore.waiters();
        match queue.entries.iter().position(|(i, _)| *i == id) {
            Some(pos) => {
                queue.entries.remove(pos);
                true
            }
            None => false,
        }
    }
}

impl Future for Acquire {
    type Output = SemaphorePermit;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Some(permit) = this.semaphore.try_acquire() {
            this.deregister();
            return Poll::Ready(permit);
        }

        this.register(cx.waker());

        // A permit may have been released between the fast path and registration
        if let Some(permit) = this.semaphore.try_acquire() {
            this.deregister();
            return Poll::Ready(permit);
        }

        Poll::Pending
    }
}

impl Drop for Acquire {
    fn drop(&mut self) {
        if self.waiter.is_some() && !self.deregister() {
            self.semaphore.wake_one();
        }
    }
}
