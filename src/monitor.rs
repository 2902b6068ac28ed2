//! The per-object monitor facade.
//!
//! A [`Monitor`] binds one lock slot to one object instance; synchronized
//! statements lower to an [`acquire`] before the protected body and rely on
//! the returned [`MonitorGuard`] to release on every exit path, including
//! panics. The slot starts empty and costs nothing beyond the record
//! itself; the OS lock behind it is materialized on the first synchronized
//! access to the object, exactly once, however many threads race there.
//!
//! The object exclusively owns its monitor and destroys it when the object
//! is deallocated. Destruction requires that no thread holds or waits on
//! the monitor, which object lifetime already implies: a deallocated object
//! has no live references left to synchronize on.
//!
//! [`acquire`]: Monitor::acquire
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use monlock::{LockRuntime, Mode, Monitor};
//!
//! let runtime = LockRuntime::new(Mode::Threaded);
//! runtime.init();
//!
//! let monitor = Arc::new(Monitor::new(&runtime));
//! let contender = Arc::clone(&monitor);
//!
//! thread::spawn(move || {
//!     let _region = contender.acquire();
//!     // mutate the object state this monitor protects
//! })
//! .join()
//! .expect("thread::spawn failed");
//!
//! let _region = monitor.acquire();
//! ```

use core::fmt::{self, Debug, Formatter};

use std::sync::Arc;

use crate::runtime::LockRuntime;
use crate::slot::{Slot, SlotGuard};

/// A per-object monitor lock, materialized on first acquisition.
///
/// Reentrant: the owning thread may nest [`acquire`] calls; other threads
/// block until the owner has dropped every nested guard.
///
/// [`acquire`]: Monitor::acquire
pub struct Monitor {
    runtime: LockRuntime,
    slot: Arc<Slot>,
}

impl Monitor {
    /// Creates the monitor record for a freshly allocated object.
    ///
    /// The slot starts empty: no OS lock exists until the first
    /// [`acquire`]. Creation is therefore cheap enough to perform on every
    /// object allocation, locked or not.
    ///
    /// [`acquire`]: Monitor::acquire
    #[must_use]
    pub fn new(runtime: &LockRuntime) -> Self {
        Self { runtime: runtime.clone(), slot: Arc::new(Slot::new()) }
    }

    /// Acquires the monitor, blocking the current thread until it owns it.
    ///
    /// The first acquisition constructs the backing lock and registers the
    /// slot for the shutdown drain. Returns a guard whose drop is the
    /// matching release; keep it alive for the span of the synchronized
    /// body.
    ///
    /// # Panics
    ///
    /// Panics if the runtime is outside its init..shutdown window.
    ///
    /// # Examples
    ///
    /// ```
    /// use monlock::{LockRuntime, Mode, Monitor};
    ///
    /// let runtime = LockRuntime::new(Mode::Threaded);
    /// runtime.init();
    ///
    /// let monitor = Monitor::new(&runtime);
    /// let outer = monitor.acquire();
    /// let nested = monitor.acquire(); // same thread: depth 2, no deadlock
    /// drop(nested);
    /// drop(outer);
    /// ```
    pub fn acquire(&self) -> MonitorGuard<'_> {
        Slot::acquire(&self.slot, &self.runtime.inner).into()
    }

    /// Attempts to acquire the monitor without blocking.
    ///
    /// Returns `None` when another thread owns the monitor. A first call on
    /// an empty slot still constructs the backing lock.
    ///
    /// # Panics
    ///
    /// Panics if the runtime is outside its init..shutdown window.
    pub fn try_acquire(&self) -> Option<MonitorGuard<'_>> {
        Slot::try_acquire(&self.slot, &self.runtime.inner).map(Into::into)
    }

    /// Acquires the monitor and runs the closure as the synchronized body.
    ///
    /// The monitor is released when the closure returns or unwinds.
    ///
    /// # Panics
    ///
    /// Panics if the runtime is outside its init..shutdown window.
    pub fn with<F, Ret>(&self, f: F) -> Ret
    where
        F: FnOnce() -> Ret,
    {
        let _guard = self.acquire();
        f()
    }

    /// Returns `true` while any thread holds the monitor.
    pub fn is_locked(&self) -> bool {
        self.slot.is_locked()
    }

    /// Destroys the monitor as part of the owning object's deallocation.
    ///
    /// Consuming the monitor already proves no guard borrows it on this
    /// thread; the runtime check below catches holders on other threads,
    /// which object deallocation rules out for any correct caller.
    ///
    /// # Panics
    ///
    /// Panics if some thread still holds the monitor. That is a programming
    /// error in the caller's object lifetime management, not a recoverable
    /// condition.
    pub fn destroy(self) {
        assert!(!self.slot.is_locked(), "monitor destroyed while held");
    }
}

impl Debug for Monitor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("populated", &self.slot.is_populated())
            .field("locked", &self.slot.is_locked())
            .finish()
    }
}

/// An RAII scope over a synchronized region. When the guard is dropped the
/// monitor releases one level of nesting, unlocking at depth zero.
///
/// Guards are not `Send`: the release must happen on the acquiring thread.
#[must_use = "if unused the monitor will immediately unlock"]
pub struct MonitorGuard<'a> {
    #[allow(dead_code)]
    inner: SlotGuard<'a>,
}

#[doc(hidden)]
impl<'a> From<SlotGuard<'a>> for MonitorGuard<'a> {
    #[inline]
    fn from(inner: SlotGuard<'a>) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod test {
    use std::sync::mpsc::channel;
    use std::sync::Arc;
    use std::thread;

    use super::Monitor;
    use crate::test::{exclusion, reentry_excludes_until_depth_zero, threaded_runtime};

    #[test]
    fn mutual_exclusion() {
        let rt = threaded_runtime();
        exclusion(Arc::new(Monitor::new(&rt)));
    }

    #[test]
    fn reentry() {
        let rt = threaded_runtime();
        reentry_excludes_until_depth_zero(Arc::new(Monitor::new(&rt)));
    }

    #[test]
    fn released_when_synchronized_body_panics() {
        let rt = threaded_runtime();
        let monitor = Arc::new(Monitor::new(&rt));

        let poisoner = Arc::clone(&monitor);
        let result = thread::spawn(move || {
            poisoner.with(|| panic!("synchronized body failed"));
        })
        .join();
        assert!(result.is_err());

        // The unwinding thread released the monitor before the panic left
        // the synchronized region.
        assert!(!monitor.is_locked());
        let reacquired = monitor.try_acquire();
        assert!(reacquired.is_some());
    }

    #[test]
    fn with_returns_the_closure_value() {
        let rt = threaded_runtime();
        let monitor = Monitor::new(&rt);
        assert_eq!(monitor.with(|| 42), 42);
    }

    #[test]
    fn destroy_before_first_acquire_is_fine() {
        let rt = threaded_runtime();
        let monitor = Monitor::new(&rt);
        monitor.destroy();
        assert_eq!(rt.shutdown(), 0);
    }

    #[test]
    fn destroyed_monitor_leaves_no_drain_work() {
        let rt = threaded_runtime();

        let destroyed = Monitor::new(&rt);
        drop(destroyed.acquire());
        destroyed.destroy();

        let survivor = Monitor::new(&rt);
        drop(survivor.acquire());

        assert_eq!(rt.shutdown(), 1);
    }

    #[test]
    #[should_panic(expected = "monitor destroyed while held")]
    fn destroy_while_held_panics() {
        let rt = threaded_runtime();
        let monitor = Arc::new(Monitor::new(&rt));

        let holder = Arc::clone(&monitor);
        let (tx, rx) = channel();
        thread::spawn(move || {
            let guard = holder.acquire();
            // Simulate a broken caller that deallocates the object while
            // another thread is still inside a synchronized region.
            std::mem::forget(guard);
            drop(holder);
            tx.send(()).unwrap();
        })
        .join()
        .unwrap();
        rx.recv().unwrap();

        let monitor = Arc::into_inner(monitor).expect("holder dropped its handle");
        monitor.destroy();
    }
}
