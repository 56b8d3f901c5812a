//! Agreement configuration.

use std::time::Duration;

/// Agreement instance configuration.
#[derive(Debug, Clone)]
pub struct AgreementConfig {
    /// How long a block or vote for a future position stays buffered.
    ///
    /// Entries older than this are dropped by the sweep that runs on each
    /// `restart`, unless the new position is exactly theirs.
    pub pending_expiry: Duration,
}

impl Default for AgreementConfig {
    fn default() -> Self {
        Self {
            pending_expiry: Duration::from_secs(10),
        }
    }
}

impl AgreementConfig {
    /// Create a new agreement configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pending buffer expiry.
    pub fn with_pending_expiry(mut self, expiry: Duration) -> Self {
        self.pending_expiry = expiry;
        self
    }
}

/// Required matching votes for a notary set of `notary_count` members.
///
/// `floor(n / 3) * 2 + 1`.
pub fn required_votes(notary_count: usize) -> usize {
    notary_count / 3 * 2 + 1
}
