//! Progress reporting for batch preloads
//!
//! The orchestrator reports per-item, completion and failure updates through
//! [`ProgressProvider`]; how they are shown is up to the caller.

/// Receives progress from a preload or batch-cache run
pub trait ProgressProvider: Send + Sync {
    /// Report a progress update
    fn report(&self, update: ProgressUpdate);

    /// Create a child provider for nested operations
    fn create_child(&self, name: &str) -> Box<dyn ProgressProvider>;

    /// Signal that the operation is complete
    fn complete(&self);
}

/// Unified progress update type
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    /// One item settled (successfully or not)
    Item {
        /// Overall completion, 0.0 to 100.0
        percent: f64,
        /// Items settled so far
        completed: usize,
        total: usize,
        /// Key or URL of the item that just settled
        current: String,
    },

    /// The batch finished; per-item failures are included in `failed`
    Finished {
        successful: usize,
        failed: usize,
        total: usize,
    },

    /// The batch as a whole failed (invalid input, timeout)
    Failed { message: String },

    /// Generic status message
    Status { message: String },
}

impl ProgressUpdate {
    /// Item update with the percentage derived from the counts
    pub fn item(completed: usize, total: usize, current: impl Into<String>) -> Self {
        Self::Item {
            percent: percent_of(completed, total),
            completed,
            total,
            current: current.into(),
        }
    }
}

/// `completed / total` as a percentage; an empty batch is complete
pub fn percent_of(completed: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        (completed as f64 / total as f64) * 100.0
    }
}

/// Null implementation for when no progress is needed
pub struct NullProvider;

impl ProgressProvider for NullProvider {
    fn report(&self, _update: ProgressUpdate) {
        // No-op: discard all progress updates
    }

    fn create_child(&self, _name: &str) -> Box<dyn ProgressProvider> {
        Box::new(NullProvider)
    }

    fn complete(&self) {
        // No-op
    }
}
