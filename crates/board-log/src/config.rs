//! Configuration for a log instance.

use board_log_core::validate_origin;

use crate::error::{LogError, Result};

/// Configuration for a [`Log`](crate::Log).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Origin line of every checkpoint this log signs.
    pub origin: String,
    /// Require each entry's payload to be present before integrating it.
    pub check_payloads: bool,
    /// Upper bound on entries folded into the tree per integration.
    pub max_batch: Option<u64>,
}

impl LogConfig {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            check_payloads: true,
            max_batch: None,
        }
    }

    pub fn check_payloads(mut self, check: bool) -> Self {
        self.check_payloads = check;
        self
    }

    /// Integrate at most `n` entries per call. Zero is treated as one.
    pub fn max_batch(mut self, n: u64) -> Self {
        self.max_batch = Some(n.max(1));
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_origin(&self.origin).map_err(LogError::from_origin)
    }
}
