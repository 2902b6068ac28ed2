//! The backing lock: the OS-level reentrant mutex a lock slot materializes
//! on first use.
//!
//! [`Backing`] is a thin wrapper over [`lock_api::RawReentrantMutex`]
//! instantiated with parking_lot's word-sized [`RawMutex`] and its
//! [`RawThreadId`] owner tracking. The same thread may lock it repeatedly;
//! the lock is released once the unlock count matches the lock count.
//! Distinct threads exclude each other for the whole nested span.

use core::fmt::{self, Debug, Formatter};

use lock_api::RawReentrantMutex;
use parking_lot::{RawMutex, RawThreadId};

/// A reentrant, mutually-exclusive lock with no associated data.
///
/// This is the resource that is expensive enough to justify lazy
/// construction: one per locked-at-least-once object, one per exercised
/// critical section. Construction never blocks and never fails; the
/// underlying parking_lot mutex allocates its waiter queue lazily on first
/// contention.
pub(crate) struct Backing {
    raw: RawReentrantMutex<RawMutex, RawThreadId>,
}

impl Backing {
    /// Creates a new backing lock in an unlocked state.
    pub(crate) const fn new() -> Self {
        Self { raw: RawReentrantMutex::INIT }
    }

    /// Acquires the lock, blocking the current thread until it is able to
    /// do so.
    ///
    /// If the current thread already owns the lock, the nesting depth is
    /// incremented instead of blocking.
    pub(crate) fn lock(&self) {
        self.raw.lock();
    }

    /// Attempts to acquire the lock without blocking.
    ///
    /// Succeeds if the lock is free or already owned by the current thread.
    pub(crate) fn try_lock(&self) -> bool {
        self.raw.try_lock()
    }

    /// Releases one level of nesting, unlocking once the depth reaches zero.
    ///
    /// # Safety
    ///
    /// The current thread must own the lock, with at least one unmatched
    /// prior `lock` or successful `try_lock`.
    pub(crate) unsafe fn unlock(&self) {
        // SAFETY: Caller guaranteed ownership with an unmatched acquisition.
        unsafe { self.raw.unlock() };
    }

    /// Returns `true` while any thread holds the lock at any depth.
    pub(crate) fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }
}

impl Debug for Backing {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backing").field("locked", &self.is_locked()).finish()
    }
}

#[cfg(test)]
mod test {
    use std::sync::mpsc::channel;
    use std::sync::Arc;
    use std::thread;

    use super::Backing;

    #[test]
    fn reentrant_on_owner_thread() {
        let backing = Backing::new();
        backing.lock();
        backing.lock();
        assert!(backing.try_lock());
        assert!(backing.is_locked());
        // SAFETY: This thread acquired the lock three times above.
        unsafe {
            backing.unlock();
            backing.unlock();
            assert!(backing.is_locked());
            backing.unlock();
        }
        assert!(!backing.is_locked());
    }

    #[test]
    fn excludes_other_threads_until_depth_zero() {
        let backing = Arc::new(Backing::new());
        backing.lock();
        backing.lock();

        let contender = Arc::clone(&backing);
        let (tx, rx) = channel();
        let handle = thread::spawn(move || {
            tx.send(contender.try_lock()).unwrap();
        });
        assert!(!rx.recv().unwrap());
        handle.join().unwrap();

        // SAFETY: This thread acquired the lock twice above.
        unsafe {
            backing.unlock();
            backing.unlock();
        }

        let contender = Arc::clone(&backing);
        thread::spawn(move || {
            assert!(contender.try_lock());
            // SAFETY: `try_lock` succeeded on this thread just above.
            unsafe { contender.unlock() };
        })
        .join()
        .unwrap();
    }
}
