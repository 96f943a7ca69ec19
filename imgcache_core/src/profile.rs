//! Platform tuning profiles
//!
//! Batch sizes, yield cadence and the persistence debounce differ between
//! roomy hosts and resource-constrained ones. The core logic only ever reads
//! these values from a [`PlatformProfile`] injected at construction.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which preset a profile was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    #[default]
    Standard,
    Constrained,
}

/// Tuning constants for one platform class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProfile {
    /// Preset this profile started from
    pub kind: ProfileKind,
    /// Quiet period after the last mutation before the snapshot is written
    pub debounce_ms: u64,
    /// Pending mutation count that forces a write without waiting for quiet
    pub flush_threshold: usize,
    /// Entries per persisted snapshot chunk
    pub chunk_size: usize,
    /// Concurrent fetches per remote batch
    pub remote_batch_size: usize,
    /// Insert cooperative yield points into long loops
    pub cooperative_yield: bool,
    /// Items processed between yields in sequential loops
    pub yield_interval: usize,
    /// Entries inserted per step while restoring the snapshot
    pub load_batch_size: usize,
    /// Period of the background expiry sweep
    pub sweep_interval_secs: u64,
}

impl PlatformProfile {
    /// Profile for hosts where blocking the scheduler briefly is harmless
    pub fn standard() -> Self {
        Self {
            kind: ProfileKind::Standard,
            debounce_ms: 500,
            flush_threshold: 50,
            chunk_size: 100,
            remote_batch_size: 5,
            cooperative_yield: false,
            yield_interval: 10,
            load_batch_size: 100,
            sweep_interval_secs: 3600,
        }
    }

    /// Profile for UI-thread-bound or memory-constrained hosts
    pub fn constrained() -> Self {
        Self {
            kind: ProfileKind::Constrained,
            debounce_ms: 1000,
            flush_threshold: 20,
            chunk_size: 50,
            remote_batch_size: 3,
            cooperative_yield: true,
            yield_interval: 5,
            load_batch_size: 50,
            sweep_interval_secs: 3600,
        }
    }

    /// Preset for the given kind
    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Standard => Self::standard(),
            ProfileKind::Constrained => Self::constrained(),
        }
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Batch size actually used for a caller-requested size
    ///
    /// Constrained profiles never run more concurrent fetches than
    /// `remote_batch_size`.
    pub fn effective_batch_size(&self, requested: usize) -> usize {
        match self.kind {
            ProfileKind::Constrained => requested.min(self.remote_batch_size),
            ProfileKind::Standard => requested,
        }
    }

    /// Whether a sequential loop should yield after `processed` items
    pub fn should_yield_after(&self, processed: usize) -> bool {
        self.cooperative_yield
            && self.yield_interval > 0
            && processed > 0
            && processed % self.yield_interval == 0
    }

    /// Reject values that would stall or disable core behaviour
    pub fn validate(&self) -> Result<(), ValidationError> {
        let positive = [
            ("flush_threshold", self.flush_threshold),
            ("chunk_size", self.chunk_size),
            ("remote_batch_size", self.remote_batch_size),
            ("load_batch_size", self.load_batch_size),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ValidationError::invalid_profile(
                    field,
                    "must be greater than 0",
                ));
            }
        }
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::invalid_profile(
                "sweep_interval_secs",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for PlatformProfile {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(PlatformProfile::standard().validate().is_ok());
        assert!(PlatformProfile::constrained().validate().is_ok());
    }

    #[test]
    fn test_constrained_is_smaller() {
        let standard = PlatformProfile::standard();
        let constrained = PlatformProfile::constrained();
        assert!(constrained.remote_batch_size < standard.remote_batch_size);
        assert!(constrained.chunk_size < standard.chunk_size);
        assert!(constrained.cooperative_yield);
        assert!(!standard.cooperative_yield);
    }

    #[test]
    fn test_effective_batch_size() {
        assert_eq!(PlatformProfile::standard().effective_batch_size(8), 8);
        assert_eq!(PlatformProfile::constrained().effective_batch_size(8), 3);
        assert_eq!(PlatformProfile::constrained().effective_batch_size(2), 2);
    }

    #[test]
    fn test_should_yield_after() {
        let constrained = PlatformProfile::constrained();
        assert!(!constrained.should_yield_after(0));
        assert!(!constrained.should_yield_after(4));
        assert!(constrained.should_yield_after(5));
        assert!(constrained.should_yield_after(10));

        let standard = PlatformProfile::standard();
        assert!(!standard.should_yield_after(10));
    }

    #[test]
    fn test_validate_rejects_zero() {
        let profile = PlatformProfile {
            chunk_size: 0,
            ..PlatformProfile::standard()
        };
        let err = profile.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn test_for_kind_and_serde() {
        let profile = PlatformProfile::for_kind(ProfileKind::Constrained);
        assert_eq!(profile, PlatformProfile::constrained());

        let json = serde_json::to_string(&ProfileKind::Constrained).unwrap();
        assert_eq!(json, "\"constrained\"");
    }
}
