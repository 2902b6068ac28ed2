//! The registry of every lock slot materialized so far.
//!
//! The registry exists for exactly one consumer: the shutdown drain. During
//! normal operation it only ever grows, one append per slot construction,
//! and appends happen while the bootstrap lock is held. The registry needs
//! no synchronization of its own because it lives *inside* the bootstrap
//! mutex; there is no way to reach it without holding that lock.

use std::sync::Weak;

use crate::slot::Slot;

/// Append-only collection of weak references to populated slots.
///
/// Entries are weak on purpose: a monitor slot is owned exclusively by its
/// object and may be destroyed long before shutdown. Such slots leave a
/// dead entry behind, which the drain skips; entries are never removed
/// while the runtime is live.
#[derive(Default)]
pub(crate) struct Registry {
    slots: Vec<Weak<Slot>>,
}

impl Registry {
    /// Creates an empty registry.
    pub(crate) fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Appends a freshly populated slot.
    ///
    /// Only called from the slot construction path, with the bootstrap lock
    /// held and the slot's backing just initialized.
    pub(crate) fn append(&mut self, slot: Weak<Slot>) {
        self.slots.push(slot);
    }

    /// Counts the registered slots that are still alive.
    pub(crate) fn live(&self) -> usize {
        self.slots.iter().filter(|slot| slot.strong_count() != 0).count()
    }

    /// Releases every surviving slot and empties the registry.
    ///
    /// Returns the number of backing locks drained. Callers must guarantee
    /// that all other runtime activity has quiesced; draining concurrently
    /// with `acquire` is a contract violation.
    ///
    /// # Panics
    ///
    /// Panics if a surviving slot is still held by some thread.
    pub(crate) fn drain(&mut self) -> usize {
        let mut drained = 0;
        for slot in self.slots.drain(..) {
            let Some(slot) = slot.upgrade() else { continue };
            assert!(!slot.is_locked(), "lock slot drained while held");
            debug_assert!(slot.is_populated());
            drained += 1;
        }
        drained
    }
}
