//! Driver configuration.

use std::time::Duration;

/// Configuration for an [`AgreementRunner`](crate::AgreementRunner).
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Length of one agreement clock tick.
    pub lambda: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            lambda: Duration::from_millis(250),
        }
    }
}

impl RunnerConfig {
    /// Create a new runner configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the clock tick length.
    pub fn with_lambda(mut self, lambda: Duration) -> Self {
        self.lambda = lambda;
        self
    }
}
