//! Batch operation results

use serde::Serialize;
use std::fmt;

/// One item that failed inside a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Local key or remote URL
    pub key: String,
    pub error: String,
}

/// Outcome of a preload or batch-cache run
///
/// `successful + failed == total` and `completed.len() == successful` once
/// the run has finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreloadReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<ItemFailure>,
    pub completed: Vec<String>,
}

impl PreloadReport {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub(crate) fn record_success(&mut self, key: &str) {
        self.successful += 1;
        self.completed.push(key.to_string());
    }

    pub(crate) fn record_failure(&mut self, key: &str, error: &impl fmt::Display) {
        self.failed += 1;
        self.errors.push(ItemFailure {
            key: key.to_string(),
            error: error.to_string(),
        });
    }

    /// Every item has settled
    pub fn is_settled(&self) -> bool {
        self.successful + self.failed == self.total
    }
}

/// Local and remote preload results with merged counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CombinedReport {
    pub local: PreloadReport,
    pub remote: PreloadReport,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl CombinedReport {
    pub fn new(local: PreloadReport, remote: PreloadReport) -> Self {
        Self {
            total: local.total + remote.total,
            successful: local.successful + remote.successful,
            failed: local.failed + remote.failed,
            local,
            remote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_invariants() {
        let mut report = PreloadReport::new(3);
        assert!(!report.is_settled());

        report.record_success("a");
        report.record_failure("b", &"boom");
        report.record_success("c");

        assert!(report.is_settled());
        assert_eq!(report.completed, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(
            report.errors,
            vec![ItemFailure {
                key: "b".to_string(),
                error: "boom".to_string()
            }]
        );
    }

    #[test]
    fn test_combined_counts() {
        let mut local = PreloadReport::new(2);
        local.record_success("logo-full");
        local.record_failure("logo-icon", &"missing");
        let mut remote = PreloadReport::new(1);
        remote.record_success("https://img.example/a.png");

        let combined = CombinedReport::new(local, remote);
        assert_eq!(combined.total, 3);
        assert_eq!(combined.successful, 2);
        assert_eq!(combined.failed, 1);
        assert_eq!(combined.local.total, 2);
    }
}
