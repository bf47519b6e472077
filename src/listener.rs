// src/listener.rs
//! Single-subscriber handler slot

use parking_lot::Mutex;
use std::sync::Arc;

/// Holds at most one listener. Attaching replaces the previous one and
/// notifications with nothing attached are dropped.
pub struct ListenerSlot<L: ?Sized> {
    slot: Mutex<Option<Arc<L>>>,
}

impl<L: ?Sized> ListenerSlot<L> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Attach a listener; returns true if one was replaced
    pub fn attach(&self, listener: Arc<L>) -> bool {
        self.slot.lock().replace(listener).is_some()
    }

    /// Detach the current listener; returns true if one was attached
    pub fn detach(&self) -> bool {
        self.slot.lock().take().is_some()
    }

    pub fn is_attached(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Clone out the listener so it can be called without holding the lock
    pub fn current(&self) -> Option<Arc<L>> {
        self.slot.lock().clone()
    }
}

impl<L: ?Sized> Default for ListenerSlot<L> {
    fn default() -> Self {
        Self::new()
    }
}
