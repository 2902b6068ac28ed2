//! Lazily constructed, reentrant monitor locks for managed-language
//! runtimes.
//!
//! A runtime that lowers `synchronized` blocks needs a mutual-exclusion
//! lock per object instance, and a handful more for its own global tables.
//! Neither set can be allocated up front: objects are created dynamically,
//! and an OS lock per object would be wasted on the vast majority that are
//! never synchronized on. This crate materializes each lock on first use,
//! exactly once even under concurrent first-use, and tears every
//! constructed lock down deterministically at process shutdown. The main
//! properties of the design are:
//!
//! - an empty lock slot costs one pointer-sized once-cell, nothing else;
//! - first acquisition constructs the backing lock under a single
//!   process-wide bootstrap lock, re-checking after taking it, so racing
//!   threads can never construct two backing locks for one slot;
//! - backing locks are reentrant: the owner may nest acquisitions, other
//!   threads block until the owner's depth reaches zero;
//! - every constructed slot is linked into a registry that the shutdown
//!   drain walks exactly once, so nothing leaks and nothing is released
//!   twice.
//!
//! Two facades share that core. [`Monitor`] backs synchronized regions on
//! one object and is destroyed with it; [`CriticalSection`] protects
//! runtime-global state, is declared once at process start and is only
//! released by the shutdown drain. Both hand out RAII guards, so a
//! synchronized body that returns early or panics still releases before
//! control leaves the region.
//!
//! All shared state lives behind an explicit [`LockRuntime`] context with a
//! documented `init`/`shutdown` lifecycle. Contexts are instantiable at
//! will, once per test if need be; nothing in this crate is a process-wide
//! static.
//!
//! # Example
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
//! // One monitor per object; the OS lock appears on first acquire.
//! let monitor = Arc::new(Monitor::new(&runtime));
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let monitor = Arc::clone(&monitor);
//!         thread::spawn(move || {
//!             let _region = monitor.acquire();
//!             // body of the synchronized block
//!         })
//!     })
//!     .collect();
//! for handle in handles {
//!     handle.join().expect("thread::spawn failed");
//! }
//!
//! // Exactly one backing lock was constructed for the one slot.
//! assert_eq!(runtime.registered(), 1);
//! assert_eq!(runtime.shutdown(), 1);
//! ```
//!
//! # Degraded single-threaded mode
//!
//! Targets without threads select [`Mode::SingleThreaded`] explicitly when
//! constructing the runtime. Every operation then keeps its call contract
//! but performs no locking and constructs nothing; the configuration is
//! never inferred, so both modes stay testable.
//!
//! # Features
//!
//! This crate does not provide any default features. Features that can be
//! enabled are:
//!
//! ## stats
//!
//! Adds construction and acquisition counters to the runtime context,
//! readable through [`LockRuntime::stats`]. Counters are atomic and
//! relaxed; they are diagnostics, not synchronization.

#![allow(clippy::module_name_repetitions)]
#![warn(missing_docs)]
#![warn(rust_2024_compatibility)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod critical;
pub mod monitor;
pub mod runtime;

pub(crate) mod backing;
pub(crate) mod registry;
pub(crate) mod slot;


pub use critical::{CriticalGuard, CriticalSection};
pub use monitor::{Monitor, MonitorGuard};
pub use runtime::{LockRuntime, Mode};

#[cfg(feature = "stats")]
#[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
pub use runtime::RuntimeStats;
