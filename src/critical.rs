//! The internal critical-section facade.
//!
//! A [`CriticalSection`] carries the same lazy-construction and reentrancy
//! contract as a monitor, but protects runtime-global structures (module
//! and type registries, loader tables) rather than a single object. The
//! fixed set of sections is declared once at process start, before any of
//! them is entered; sections are never destroyed individually and are only
//! released as part of the shutdown drain.

use core::fmt::{self, Debug, Formatter};

use std::sync::Arc;

use crate::runtime::LockRuntime;
use crate::slot::{Slot, SlotGuard};

/// A statically-declared critical section over runtime-global state.
///
/// Like a monitor, the backing lock is materialized on the first [`enter`];
/// a section that is declared but never entered costs only its record.
///
/// [`enter`]: CriticalSection::enter
///
/// # Examples
///
/// ```
/// use monlock::{CriticalSection, LockRuntime, Mode};
///
/// let runtime = LockRuntime::new(Mode::Threaded);
/// runtime.init();
///
/// // Declared once, at process start, next to the state it protects.
/// let module_registry_lock = CriticalSection::new(&runtime);
///
/// {
///     let _region = module_registry_lock.enter();
///     // mutate the module registry
/// }
///
/// // Never destroyed individually; the shutdown drain releases it.
/// assert_eq!(runtime.shutdown(), 1);
/// ```
pub struct CriticalSection {
    runtime: LockRuntime,
    slot: Arc<Slot>,
}

impl CriticalSection {
    /// Declares a critical section on the given runtime.
    ///
    /// The slot starts empty; no OS lock exists until the first [`enter`].
    ///
    /// [`enter`]: CriticalSection::enter
    #[must_use]
    pub fn new(runtime: &LockRuntime) -> Self {
        Self { runtime: runtime.clone(), slot: Arc::new(Slot::new()) }
    }

    /// Enters the critical section, blocking until this thread owns it.
    ///
    /// Reentrant on the owning thread. The returned guard exits the section
    /// when dropped, on every exit path.
    ///
    /// # Panics
    ///
    /// Panics if the runtime is outside its init..shutdown window.
    pub fn enter(&self) -> CriticalGuard<'_> {
        Slot::acquire(&self.slot, &self.runtime.inner).into()
    }

    /// Attempts to enter the critical section without blocking.
    ///
    /// # Panics
    ///
    /// Panics if the runtime is outside its init..shutdown window.
    pub fn try_enter(&self) -> Option<CriticalGuard<'_>> {
        Slot::try_acquire(&self.slot, &self.runtime.inner).map(Into::into)
    }

    /// Enters the critical section and runs the closure inside it.
    ///
    /// The section is exited when the closure returns or unwinds.
    ///
    /// # Panics
    ///
    /// Panics if the runtime is outside its init..shutdown window.
    pub fn with<F, Ret>(&self, f: F) -> Ret
    where
        F: FnOnce() -> Ret,
    {
        let _guard = self.enter();
        f()
    }
}

impl Debug for CriticalSection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CriticalSection")
            .field("populated", &self.slot.is_populated())
            .field("locked", &self.slot.is_locked())
            .finish()
    }
}

/// An RAII scope over a critical section. Dropping the guard exits one
/// level of nesting, releasing the section at depth zero.
///
/// Guards are not `Send`: the exit must happen on the entering thread.
#[must_use = "if unused the critical section will immediately unlock"]
pub struct CriticalGuard<'a> {
    #[allow(dead_code)]
    inner: SlotGuard<'a>,
}

#[doc(hidden)]
impl<'a> From<SlotGuard<'a>> for CriticalGuard<'a> {
    #[inline]
    fn from(inner: SlotGuard<'a>) -> Self {
        Self { inner }
    }
}
