//! Single-slot fast-forward mailbox.

use parking_lot::Mutex;

/// Single-slot signal telling the driver to skip ahead to a period.
///
/// Posting never blocks. A post that arrives before the previous one was
/// taken overwrites it only if it names a larger period, so the slot always
/// holds the furthest target seen since the last take.
#[derive(Debug, Default)]
pub(crate) struct FastForward {
    slot: Mutex<Option<u64>>,
}

impl FastForward {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Post a fast-forward target.
    pub fn post(&self, period: u64) {
        let mut slot = self.slot.lock();
        *slot = Some(slot.map_or(period, |pending| pending.max(period)));
    }

    /// Take the pending target without blocking.
    pub fn take(&self) -> Option<u64> {
        self.slot.lock().take()
    }

    /// Peek at the pending target.
    pub fn pending(&self) -> Option<u64> {
        *self.slot.lock()
    }

    /// Discard any pending target.
    pub fn reset(&self) {
        *self.slot.lock() = None;
    }
}
