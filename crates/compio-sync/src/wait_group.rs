//! Async wait group for compio runtime
//!
//! A [`WaitGroup`] counts outstanding units of work. Work is registered with
//! [`WaitGroup::add`] or [`WaitGroup::enter`], retired with [`WaitGroup::done`]
//! (or by dropping the [`WaitGuard`]), and any number of tasks can await
//! [`WaitGroup::wait`] until the count drops to zero.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::waiters::WakerList;

/// Completion counter that can be awaited until it drains
///
/// Clones share the same counter.
///
/// # Example
///
/// ```rust,no_run
/// use compio_sync::WaitGroup;
///
/// # async fn example() {
/// let wg = WaitGroup::new();
///
/// for i in 0..4 {
///     let guard = wg.enter();
///     compio::runtime::spawn(async move {
///         println!("worker {}", i);
///         drop(guard);
///     })
///     .detach();
/// }
///
/// wg.wait().await;
/// # }
/// ```
#[derive(Clone, Default)]
pub struct WaitGroup {
    inner: Arc<WaitGroupInner>,
}

#[derive(Default)]
struct WaitGroupInner {
    count: AtomicUsize,
    waiters: WakerList,
}

impl WaitGroup {
    /// Create an empty wait group
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `n` more outstanding units
    pub fn add(&self, n: usize) {
        self.inner.count.fetch_add(n, Ordering::AcqRel);
    }

    /// Retire one outstanding unit, waking all waiters if it was the last
    ///
    /// # Panics
    ///
    /// Panics if called more times than units were added.
    pub fn done(&self) {
        let previous = self.inner.count.fetch_sub(1, Ordering::AcqRel);
        assert!(previous > 0, "WaitGroup::done called with no outstanding work");
        if previous == 1 {
            self.inner.waiters.wake_all();
        }
    }

    /// Register one unit and return a guard that retires it on drop
    #[must_use = "dropping the guard immediately retires the unit"]
    pub fn enter(&self) -> WaitGuard {
        self.add(1);
        WaitGuard { group: self.clone() }
    }

    /// Number of outstanding units
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Wait until the count reaches zero
    ///
    /// Resolves immediately if nothing is outstanding. Units added after the
    /// future resolved are not waited for.
    #[must_use = "futures do nothing unless polled"]
    pub fn wait(&self) -> WaitGroupFuture {
        WaitGroupFuture {
            group: self.clone(),
            waiter: None,
        }
    }
}

impl fmt::Debug for WaitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitGroup")
            .field("count", &self.count())
            .finish()
    }
}

/// RAII registration of one unit in a [`WaitGroup`]
#[derive(Debug)]
pub struct WaitGuard {
    group: WaitGroup,
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        self.group.done();
    }
}

/// Future returned by [`WaitGroup::wait`]
///
/// Dropping it before it resolves removes its waker from the group.
#[derive(Debug)]
pub struct WaitGroupFuture {
    group: WaitGroup,
    /// Waker entry id while registered
    waiter: Option<u64>,
}

impl Future for WaitGroupFuture {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();

        if this.group.count() == 0 {
            this.group.inner.waiters.deregister(&mut this.waiter);
            return Poll::Ready(());
        }

        this.group.inner.waiters.register(&mut this.waiter, cx.waker());

        // The last unit may have finished before the waker was registered
        if this.group.count() == 0 {
            this.group.inner.waiters.deregister(&mut this.waiter);
            return Poll::Ready(());
        }

        Poll::Pending
    }
}

impl Drop for WaitGroupFuture {
    fn drop(&mut self) {
        self.group.inner.waiters.deregister(&mut self.waiter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_wait_group_counts() {
        let wg = WaitGroup::new();
        assert_eq!(wg.count(), 0);

        wg.add(2);
        assert_eq!(wg.count(), 2);

        let guard = wg.enter();
        assert_eq!(wg.count(), 3);

        drop(guard);
        wg.done();
        wg.done();
        assert_eq!(wg.count(), 0);
    }

    #[test]
    #[should_panic(expected = "WaitGroup::done called with no outstanding work")]
    fn test_wait_group_done_underflow_panics() {
        let wg = WaitGroup::new();
        wg.done();
    }

    #[test]
    fn test_dropped_wait_futures_leave_no_waker() {
        use futures::task::noop_waker;

        let wg = WaitGroup::new();
        let guard = wg.enter();

        for _ in 0..1000 {
            let w = noop_waker();
            let mut pending = wg.wait();
            assert!(Pin::new(&mut pending)
                .poll(&mut Context::from_waker(&w))
                .is_pending());
        }
        assert_eq!(wg.inner.waiters.len(), 0);

        // A waiter that stays alive keeps exactly one entry across re-polls
        let w = noop_waker();
        let mut live = wg.wait();
        for _ in 0..3 {
            assert!(Pin::new(&mut live)
                .poll(&mut Context::from_waker(&w))
                .is_pending());
        }
        assert_eq!(wg.inner.waiters.len(), 1);

        drop(guard);
        assert!(Pin::new(&mut live)
            .poll(&mut Context::from_waker(&w))
            .is_ready());
        assert_eq!(wg.inner.waiters.len(), 0);
    }

    #[compio::test]
    async fn test_wait_on_empty_group_is_immediate() {
        let wg = WaitGroup::new();
        wg.wait().await;
    }

    #[compio::test]
    async fn test_wait_until_all_guards_drop() {
        let wg = WaitGroup::new();
        let finished = Rc::new(Cell::new(0));

        for _ in 0..5 {
            let guard = wg.enter();
            let finished = finished.clone();
            compio::runtime::spawn(async move {
                finished.set(finished.get() + 1);
                drop(guard);
            })
            .detach();
        }

        wg.wait().await;
        assert_eq!(finished.get(), 5);
        assert_eq!(wg.count(), 0);
    }

    #[compio::test]
    async fn test_multiple_waiters_released_together() {
        let wg = WaitGroup::new();
        let guard = wg.enter();

        let mut handles = Vec::new();
        for i in 0..3 {
            let wg = wg.clone();
            handles.push(compio::runtime::spawn(async move {
                wg.wait().await;
                i
            }));
        }

        drop(guard);

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }
        assert_eq!(total, 3);
    }
}
