//! Progress provider that captures updates

use imgcache_core::progress::{ProgressProvider, ProgressUpdate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Captures progress updates; children share the parent's log
#[derive(Clone, Default)]
pub struct RecordingProgress {
    updates: Arc<Mutex<Vec<ProgressUpdate>>>,
    completions: Arc<AtomicUsize>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().unwrap().clone()
    }

    /// `(percent, completed, total, current)` of every item update
    pub fn items(&self) -> Vec<(f64, usize, usize, String)> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter_map(|update| match update {
                ProgressUpdate::Item {
                    percent,
                    completed,
                    total,
                    current,
                } => Some((*percent, *completed, *total, current.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn last(&self) -> Option<ProgressUpdate> {
        self.updates.lock().unwrap().last().cloned()
    }

    /// Number of `complete()` calls, children included
    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }
}

impl ProgressProvider for RecordingProgress {
    fn report(&self, update: ProgressUpdate) {
        self.updates.lock().unwrap().push(update);
    }

    fn create_child(&self, _name: &str) -> Box<dyn ProgressProvider> {
        Box::new(self.clone())
    }

    fn complete(&self) {
        self.completions.fetch_add(1, Ordering::SeqCst);
    }
}
