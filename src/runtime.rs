//! The runtime context: bootstrap lock, registry and lifecycle window.
//!
//! Everything the two facades share lives behind one explicit, instantiable
//! [`LockRuntime`] handle instead of process-wide statics: the bootstrap
//! lock that serializes every slot construction, the registry it protects,
//! the `init`/`shutdown` lifecycle flag, and the concurrency mode. Handles
//! are cheap to clone and share a single context, so a test can stand up
//! and tear down as many independent runtimes as it likes.

use core::fmt::{self, Debug, Formatter};
use core::sync::atomic::AtomicU8;
use core::sync::atomic::Ordering::{AcqRel, Acquire};

use std::sync::Arc;

use parking_lot::Mutex;

use crate::registry::Registry;

#[cfg(feature = "stats")]
use core::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// The concurrency configuration of a runtime, chosen explicitly at
/// construction and never inferred.
///
/// Degraded mode exists for targets where no second thread can ever run:
/// every operation keeps its call contract (ordering, panics on misuse)
/// while providing no actual exclusion and constructing no OS locks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Real locks, real exclusion. The default for any threaded target.
    Threaded,
    /// Degraded single-threaded mode: all lock operations are no-ops.
    SingleThreaded,
}

/// Lifecycle states of a runtime context.
const UNINIT: u8 = 0;
const RUNNING: u8 = 1;
const SHUTDOWN: u8 = 2;

/// Construction and acquisition counters (available with the `stats`
/// feature).
#[cfg(feature = "stats")]
#[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
#[derive(Debug, Default)]
pub struct RuntimeStats {
    /// Total number of backing locks constructed.
    pub total_constructed: AtomicU64,
    /// Total number of lock acquisitions, nested ones included.
    pub total_acquisitions: AtomicU64,
    /// Total number of acquisitions that had to block.
    pub total_contended: AtomicU64,
}

/// Shared state behind every clone of a [`LockRuntime`] handle.
pub(crate) struct RuntimeInner {
    /// The bootstrap lock. Serializes all slot construction; the registry
    /// lives inside it so appends are only possible while it is held.
    pub(crate) bootstrap: Mutex<Registry>,
    /// Current lifecycle state, one of `UNINIT`/`RUNNING`/`SHUTDOWN`.
    state: AtomicU8,
    mode: Mode,
    #[cfg(feature = "stats")]
    pub(crate) stats: RuntimeStats,
}

impl RuntimeInner {
    /// Asserts that `op` is invoked inside the init..shutdown window.
    pub(crate) fn expect_running(&self, op: &str) {
        assert!(
            self.state.load(Acquire) == RUNNING,
            "`{op}` called outside the init..shutdown window"
        );
    }

    /// Returns `true` when the runtime runs in degraded single-threaded
    /// mode.
    pub(crate) fn degraded(&self) -> bool {
        self.mode == Mode::SingleThreaded
    }
}

/// A handle to one runtime lock context.
///
/// The handle owns the bootstrap lock (constructed eagerly by [`new`]) and
/// the registry of every slot materialized so far. Facades hold a clone of
/// the handle; all clones refer to the same context.
///
/// # Lifecycle
///
/// ```
/// use monlock::{LockRuntime, Mode, Monitor};
///
/// let runtime = LockRuntime::new(Mode::Threaded);
/// runtime.init();
///
/// let monitor = Monitor::new(&runtime);
/// {
///     let _region = monitor.acquire();
///     // synchronized body
/// }
///
/// monitor.destroy();
/// assert_eq!(runtime.shutdown(), 0); // the monitor was already destroyed
/// ```
///
/// [`new`]: LockRuntime::new
#[derive(Clone)]
pub struct LockRuntime {
    pub(crate) inner: Arc<RuntimeInner>,
}

impl LockRuntime {
    /// Creates a new runtime context in the given mode.
    ///
    /// The bootstrap lock is constructed eagerly here; no other lock exists
    /// yet. The context stays inert until [`init`] opens the operational
    /// window.
    ///
    /// [`init`]: LockRuntime::init
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        let inner = RuntimeInner {
            bootstrap: Mutex::new(Registry::new()),
            state: AtomicU8::new(UNINIT),
            mode,
            #[cfg(feature = "stats")]
            stats: RuntimeStats::default(),
        };
        Self { inner: Arc::new(inner) }
    }

    /// Opens the operational window.
    ///
    /// Idempotent: repeated calls on a running context are no-ops, matching
    /// the usual static-constructor guard.
    ///
    /// # Panics
    ///
    /// Panics if the runtime has already been shut down; contexts are not
    /// restartable.
    pub fn init(&self) {
        match self.inner.state.compare_exchange(UNINIT, RUNNING, AcqRel, Acquire) {
            Ok(_) | Err(RUNNING) => {}
            Err(_) => panic!("`init` called after shutdown"),
        }
    }

    /// Returns `true` while the runtime is inside its operational window.
    pub fn is_running(&self) -> bool {
        self.inner.state.load(Acquire) == RUNNING
    }

    /// Returns the mode this runtime was constructed with.
    pub fn mode(&self) -> Mode {
        self.inner.mode
    }

    /// Counts the registered slots that are still alive.
    ///
    /// Takes the bootstrap lock; intended for shutdown-time accounting and
    /// tests, not for hot paths.
    pub fn registered(&self) -> usize {
        self.inner.bootstrap.lock().live()
    }

    /// Closes the operational window and drains the registry.
    ///
    /// Walks every registered slot once and releases its backing lock,
    /// returning the number of locks drained. Dead entries, left behind by
    /// monitors destroyed with their objects, are skipped. Repeated calls
    /// are no-ops returning 0. The bootstrap lock is released last, after
    /// the drain completes.
    ///
    /// Callers must guarantee that all other runtime activity has quiesced;
    /// a slot still held by some thread makes the drain panic.
    pub fn shutdown(&self) -> usize {
        if self.inner.state.compare_exchange(RUNNING, SHUTDOWN, AcqRel, Acquire).is_err() {
            return 0;
        }
        self.inner.bootstrap.lock().drain()
    }

    /// Returns `(constructed, acquisitions, contended)` counters.
    #[cfg(feature = "stats")]
    #[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
    pub fn stats(&self) -> (u64, u64, u64) {
        let stats = &self.inner.stats;
        (
            stats.total_constructed.load(Relaxed),
            stats.total_acquisitions.load(Relaxed),
            stats.total_contended.load(Relaxed),
        )
    }

    /// Resets all statistics counters.
    ///
    /// The counters are reset independently, so calling this while the
    /// runtime is actively used may produce inconsistent snapshots.
    #[cfg(feature = "stats")]
    #[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
    pub fn reset_stats(&self) {
        self.inner.stats.total_constructed.store(0, Relaxed);
        self.inner.stats.total_acquisitions.store(0, Relaxed);
        self.inner.stats.total_contended.store(0, Relaxed);
    }
}

impl Debug for LockRuntime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = match self.inner.state.load(Acquire) {
            UNINIT => "uninit",
            RUNNING => "running",
            _ => "shutdown",
        };
        f.debug_struct("LockRuntime")
            .field("mode", &self.inner.mode)
            .field("state", &state)
            .finish_non_exhaustive()
    }
}
