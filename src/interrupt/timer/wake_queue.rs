//! Threads sleeping until an absolute tick.
//!
//! Entries are intrusive: a [`SleepEntry`] lives on the sleeping thread's
//! stack and is linked into the queue in place. Neither inserting nor draining
//! allocates, so draining is safe from the timer handler.

use core::marker::PhantomPinned;
use core::pin::Pin;

use intrusive_collections::{intrusive_adapter, LinkedList, LinkedListLink, UnsafeRef};

use super::Tick;

/// A pending sleep request.
pub struct SleepEntry<T> {
    link: LinkedListLink,
    thread: T,
    wake_at: Tick,
    _pin: PhantomPinned,
}

impl<T> SleepEntry<T> {
    pub fn new(thread: T, wake_at: Tick) -> Self {
        Self {
            link: LinkedListLink::new(),
            thread,
            wake_at,
            _pin: PhantomPinned,
        }
    }

    pub fn wake_at(&self) -> Tick { self.wake_at }

    pub fn thread(&self) -> &T { &self.thread }

    pub fn is_queued(&self) -> bool { self.link.is_linked() }
}

intrusive_adapter!(SleepAdapter<T> = UnsafeRef<SleepEntry<T>>: SleepEntry<T> { link: LinkedListLink });

/// Sleep entries ordered by wake tick. Entries with equal wake ticks stay in
/// insertion order.
pub struct WakeQueue<T> {
    list: LinkedList<SleepAdapter<T>>,
}

// SAFETY: Entries are only reached through the queue, and the queue is only
// touched with interrupts masked and its lock held.
unsafe impl<T: Send> Send for WakeQueue<T> {}

impl<T: Clone> WakeQueue<T> {
    pub fn new() -> Self {
        Self {
            list: LinkedList::new(SleepAdapter::new()),
        }
    }

    pub fn is_empty(&self) -> bool { self.list.is_empty() }

    pub fn len(&self) -> usize { self.list.iter().count() }

    /// Wake tick of the earliest entry.
    pub fn next_wake(&self) -> Option<Tick> { self.list.front().get().map(SleepEntry::wake_at) }

    /// Links `entry` behind every entry due at or before its wake tick.
    ///
    /// # Safety
    /// `entry` must not be in any queue, and must stay alive until it is
    /// handed back by [`WakeQueue::drain_due`].
    pub unsafe fn insert(&mut self, entry: Pin<&SleepEntry<T>>) {
        debug_assert!(!entry.is_queued());
        let wake_at = entry.wake_at;

        let mut cursor = self.list.front_mut();
        while cursor.get().is_some_and(|queued| queued.wake_at <= wake_at) {
            cursor.move_next();
        }
        // SAFETY: Caller keeps the pinned entry alive while it is linked.
        let entry = unsafe { UnsafeRef::from_raw(Pin::get_ref(entry)) };
        // Inserting before the null position appends.
        cursor.insert_before(entry);
    }

    /// Unlinks every entry due at `now` in queue order and passes its thread
    /// to `wake`. Returns the number of entries woken.
    ///
    /// The entry is unlinked before `wake` runs and is not touched afterwards,
    /// so the woken thread may free it right away.
    pub fn drain_due(&mut self, now: Tick, mut wake: impl FnMut(T)) -> usize {
        let mut woken = 0;
        while self.next_wake().is_some_and(|wake_at| wake_at <= now) {
            let Some(entry) = self.list.pop_front() else {
                break;
            };
            let thread = entry.thread.clone();
            wake(thread);
            woken += 1;
        }
        woken
    }
}

impl<T: Clone> Default for WakeQueue<T> {
    fn default() -> Self { Self::new() }
}
