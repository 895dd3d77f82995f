//! A strict-FIFO fair lock with cooperative yielding.
//!
//! The store has no native transaction isolation, so mutual exclusion over
//! the shared connection is enforced at the application level. Fairness is a
//! correctness requirement here, not an optimization: a request handler must
//! not be starved behind an indefinitely long bulk scan. The queue order is
//! therefore implemented explicitly as a ticket lock rather than assumed
//! from a platform mutex's scheduling behavior.

use parking_lot::{Condvar, Mutex};
use std::ops::{Deref, DerefMut};
use std::thread::{self, ThreadId};

#[derive(Debug)]
struct TicketQueue {
    /// The next ticket to hand out.
    next_ticket: u64,
    /// The ticket currently allowed to hold the lock.
    now_serving: u64,
    /// The thread holding the lock, if any.
    holder: Option<ThreadId>,
}

/// A mutual-exclusion lock that grants access in strict arrival order.
///
/// `FairMutex` protects a value the way `parking_lot::Mutex` does, with two
/// additional guarantees:
///
/// - **FIFO fairness**: threads acquire the lock in exactly the order their
///   `lock()` calls arrived. No earlier waiter can be passed by a later one.
/// - **Cooperative yielding**: the holder can cede its turn at a safe
///   boundary via [`FairMutexGuard::yield_if_contended`], re-entering the
///   back of the queue instead of relying on preemption.
///
/// The lock is not reentrant. A `lock()` call from the thread that already
/// holds it panics immediately: silent self-deadlock or silent reentrancy
/// would both hide a programming defect.
///
/// Unlocking is RAII. The guard is not `Send`, so only the thread that
/// acquired the lock can release it.
#[derive(Debug)]
pub struct FairMutex<T> {
    queue: Mutex<TicketQueue>,
    turn: Condvar,
    data: Mutex<T>,
}

impl<T> FairMutex<T> {
    /// Creates a fair lock protecting `value`.
    pub fn new(value: T) -> Self {
        Self {
            queue: Mutex::new(TicketQueue {
                next_ticket: 0,
                now_serving: 0,
                holder: None,
            }),
            turn: Condvar::new(),
            data: Mutex::new(value),
        }
    }

    /// Blocks until this thread is the sole holder, in strict arrival order.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread already holds the lock. The lock is not
    /// reentrant; a double lock is a fatal misuse, not a recoverable error.
    pub fn lock(&self) -> FairMutexGuard<'_, T> {
        let me = thread::current().id();
        self.wait_for_turn(me, true);

        // The ticket queue admits one thread at a time, so the data mutex is
        // always uncontended at this point.
        let inner = self.data.lock();
        FairMutexGuard {
            lock: self,
            inner: Some(inner),
        }
    }

    /// Returns the number of threads currently waiting for the lock.
    pub fn waiters(&self) -> usize {
        let queue = self.queue.lock();
        (queue.next_ticket - queue.now_serving).saturating_sub(1) as usize
    }

    /// Returns true if some thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.queue.lock().holder.is_some()
    }

    /// Consumes the lock and returns the protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Takes a ticket for `me` and blocks until it is served.
    fn wait_for_turn(&self, me: ThreadId, check_reentry: bool) {
        let mut queue = self.queue.lock();

        if check_reentry && queue.holder == Some(me) {
            drop(queue);
            panic!("connection lock is not reentrant: already held by this thread");
        }

        let ticket = queue.next_ticket;
        queue.next_ticket += 1;
        while queue.now_serving != ticket {
            self.turn.wait(&mut queue);
        }
        queue.holder = Some(me);
    }

    /// Releases holder status and admits the next ticket.
    fn release(&self) {
        let mut queue = self.queue.lock();
        queue.holder = None;
        queue.now_serving += 1;
        drop(queue);
        self.turn.notify_all();
    }
}

/// RAII guard for a [`FairMutex`]. Dereferences to the protected value;
/// dropping it releases the lock.
pub struct FairMutexGuard<'a, T> {
    lock: &'a FairMutex<T>,
    /// `None` only transiently, while the guard is parked inside
    /// [`FairMutexGuard::yield_if_contended`].
    inner: Option<parking_lot::MutexGuard<'a, T>>,
}

impl<T> FairMutexGuard<'_, T> {
    /// Cedes this thread's turn if any other thread is waiting.
    ///
    /// Returns `false` immediately when the wait queue is empty. Otherwise
    /// the lock is released, this thread re-enters the back of the FIFO
    /// queue, blocks until served again, and the call returns `true`. Every
    /// thread that was already waiting is granted the lock before this
    /// thread resumes.
    ///
    /// This gives a long bulk operation an explicit checkpoint at which to
    /// interleave fairly with waiting readers and writers.
    ///
    /// # Panics
    ///
    /// Panics if, immediately after releasing, this thread is still recorded
    /// as the holder. That can only happen if lock state has been corrupted
    /// by a reentrant acquisition and is a fatal internal-state error.
    pub fn yield_if_contended(&mut self) -> bool {
        let me = thread::current().id();
        {
            let queue = self.lock.queue.lock();
            if queue.next_ticket - queue.now_serving <= 1 {
                return false;
            }
        }

        self.inner = None;
        self.lock.release();

        if self.lock.queue.lock().holder == Some(me) {
            panic!("connection still held after yielding; lock state is corrupt");
        }

        self.lock.wait_for_turn(me, false);
        self.inner = Some(self.lock.data.lock());
        true
    }
}

impl<T> Deref for FairMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.inner.as_ref().expect("guard is parked")
    }
}

impl<T> DerefMut for FairMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.inner.as_mut().expect("guard is parked")
    }
}

impl<T> Drop for FairMutexGuard<'_, T> {
    fn drop(&mut self) {
        self.inner = None;
        self.lock.release();
    }
}
