//! Waker bookkeeping for broadcast-style primitives

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::Waker;

/// Wakers that are all released together, keyed per waiting future
///
/// Used by [`crate::WaitGroup`], which wakes every waiter at once when its
/// count drains. Each future keeps the id handed out by
/// [`register`](WakerList::register) and removes its entry when dropped, so
/// abandoned waits do not pile up. Callers must re-check their condition after
/// registering to avoid a missed wakeup.
#[derive(Default)]
pub(crate) struct WakerList {
    entries: Mutex<Entries>,
}

#[derive(Default)]
struct Entries {
    wakers: Vec<(u64, Waker)>,
    next_id: u64,
}

impl WakerList {
    fn lock(&self) -> MutexGuard<'_, Entries> {
        // A panic while holding the lock cannot leave the entries half-updated
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or refresh the entry identified by `key`
    ///
    /// `key` is `None` for a future that has no live entry; it is set to the
    /// new entry's id.
    pub(crate) fn register(&self, key: &mut Option<u64>, waker: &Waker) {
        let mut entries = self.lock();

        if let Some(id) = *key {
            if let Some((_, queued)) = entries.wakers.iter_mut().find(|(i, _)| *i == id) {
                if !queued.will_wake(waker) {
                    queued.clone_from(waker);
                }
                return;
            }
        }

        let id = entries.next_id;
        entries.next_id = entries.next_id.wrapping_add(1);
        entries.wakers.push((id, waker.clone()));
        *key = Some(id);
    }

    /// Remove the entry identified by `key`, if it is still present
    pub(crate) fn deregister(&self, key: &mut Option<u64>) {
        let Some(id) = key.take() else {
            return;
        };
        let mut entries = self.lock();
        if let Some(pos) = entries.wakers.iter().position(|(i, _)| *i == id) {
            entries.wakers.swap_remove(pos);
        }
    }

    /// Wake and remove every registered waker
    pub(crate) fn wake_all(&self) {
        let wakers = std::mem::take(&mut self.lock().wakers);
        for (_, waker) in wakers {
            waker.wake();
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().wakers.len()
    }
}
