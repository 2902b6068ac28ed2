//! Lock slots and their lazy, construct-once backing locks.
//!
//! A [`Slot`] is the small per-entity record both facades are built from:
//! one per object instance for monitors, one per declared critical section.
//! It starts empty and materializes its [`Backing`] lock on first
//! acquisition, exactly once, even when several threads race on the same
//! empty slot. Construction is serialized by the runtime's bootstrap lock;
//! publication of the finished lock is handled by the [`OnceLock`]
//! single-initialization guard, so no observer can see a partially
//! constructed backing.

use core::marker::PhantomData;

use std::sync::{Arc, OnceLock};

use crate::backing::Backing;
use crate::runtime::RuntimeInner;

#[cfg(feature = "stats")]
use core::sync::atomic::Ordering::Relaxed;

/// A lazily populated lock slot.
///
/// The backing field transitions from empty to populated at most once over
/// the slot's lifetime and is never cleared afterwards; whoever owns the
/// slot releases the backing lock by dropping the last `Arc`.
pub(crate) struct Slot {
    backing: OnceLock<Backing>,
}

impl Slot {
    /// Creates a new, empty slot.
    pub(crate) fn new() -> Self {
        Self { backing: OnceLock::new() }
    }

    /// Acquires the slot's backing lock, constructing it first if this is
    /// the slot's first acquisition.
    ///
    /// Blocks until the calling thread holds (possibly nested) ownership.
    /// In degraded single-threaded mode this is a no-op that returns an
    /// inert guard and constructs nothing.
    ///
    /// # Panics
    ///
    /// Panics if the runtime is outside its init..shutdown window.
    pub(crate) fn acquire<'a>(this: &'a Arc<Self>, rt: &RuntimeInner) -> SlotGuard<'a> {
        rt.expect_running("acquire");
        if rt.degraded() {
            return SlotGuard::inert();
        }
        let backing = match this.backing.get() {
            Some(backing) => backing,
            None => Self::construct(this, rt),
        };
        #[cfg(feature = "stats")]
        {
            rt.stats.total_acquisitions.fetch_add(1, Relaxed);
            if !backing.try_lock() {
                rt.stats.total_contended.fetch_add(1, Relaxed);
                backing.lock();
            }
        }
        #[cfg(not(feature = "stats"))]
        backing.lock();
        SlotGuard::locked(backing)
    }

    /// Attempts to acquire the slot's backing lock without blocking.
    ///
    /// A first acquisition still constructs the backing lock: only the
    /// final lock step is non-blocking. Succeeds when the lock is free or
    /// already owned by the calling thread.
    ///
    /// # Panics
    ///
    /// Panics if the runtime is outside its init..shutdown window.
    pub(crate) fn try_acquire<'a>(this: &'a Arc<Self>, rt: &RuntimeInner) -> Option<SlotGuard<'a>> {
        rt.expect_running("try_acquire");
        if rt.degraded() {
            return Some(SlotGuard::inert());
        }
        let backing = match this.backing.get() {
            Some(backing) => backing,
            None => Self::construct(this, rt),
        };
        backing.try_lock().then(|| {
            #[cfg(feature = "stats")]
            rt.stats.total_acquisitions.fetch_add(1, Relaxed);
            SlotGuard::locked(backing)
        })
    }

    /// Constructs the backing lock under the bootstrap lock and links the
    /// slot into the registry.
    ///
    /// The re-check after taking the bootstrap lock is what prevents two
    /// racing threads from each constructing a distinct backing for the
    /// same slot: `get_or_init` runs the initializer only if the slot is
    /// still empty, and every initializer holds the bootstrap lock. The
    /// registry append happens inside the initializer, so a slot is
    /// registered if and only if it is populated.
    #[cold]
    fn construct<'a>(this: &'a Arc<Self>, rt: &RuntimeInner) -> &'a Backing {
        let mut registry = rt.bootstrap.lock();
        let backing = this.backing.get_or_init(|| {
            registry.append(Arc::downgrade(this));
            #[cfg(feature = "stats")]
            rt.stats.total_constructed.fetch_add(1, Relaxed);
            Backing::new()
        });
        drop(registry);
        backing
    }

    /// Returns `true` once the backing lock has been constructed.
    pub(crate) fn is_populated(&self) -> bool {
        self.backing.get().is_some()
    }

    /// Returns `true` while any thread holds the backing lock.
    ///
    /// An empty slot is never locked.
    pub(crate) fn is_locked(&self) -> bool {
        self.backing.get().is_some_and(Backing::is_locked)
    }
}

/// An RAII scope holding one level of ownership of a slot's backing lock.
///
/// Dropping the guard releases that level; the lock itself unlocks once the
/// owning thread has dropped every nested guard. Guards are neither `Send`
/// nor `Sync`: reentrancy accounting is tied to the acquiring thread.
#[must_use = "if unused the slot will immediately unlock"]
pub(crate) struct SlotGuard<'a> {
    /// `None` for guards handed out in degraded single-threaded mode.
    backing: Option<&'a Backing>,
    /// Reentrant ownership must be released on the acquiring thread.
    _not_send: PhantomData<*const ()>,
}

impl<'a> SlotGuard<'a> {
    /// Creates a guard over a backing lock held by the current thread.
    fn locked(backing: &'a Backing) -> Self {
        Self { backing: Some(backing), _not_send: PhantomData }
    }

    /// Creates an inert guard that releases nothing on drop.
    fn inert() -> Self {
        Self { backing: None, _not_send: PhantomData }
    }
}

impl Drop for SlotGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        if let Some(backing) = self.backing {
            // SAFETY: The guard was created right after this thread locked
            // the backing, and guards cannot move across threads, so drop
            // runs on the owning thread with an unmatched acquisition.
            unsafe { backing.unlock() };
        }
    }
}
