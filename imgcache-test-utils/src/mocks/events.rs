//! Event sink that records everything it receives

use imgcache_core::events::{CacheEvent, EventSink, StorageOp};
use std::sync::Mutex;

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<CacheEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CacheEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Entry counts of every successful snapshot save, in order
    pub fn saves(&self) -> Vec<usize> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                CacheEvent::SnapshotSaved { entries, .. } => Some(*entries),
                _ => None,
            })
            .collect()
    }

    /// Operations whose storage failure was swallowed
    pub fn storage_failures(&self) -> Vec<StorageOp> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                CacheEvent::StorageFailed { op, .. } => Some(*op),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, event: &CacheEvent) -> bool {
        self.events.lock().unwrap().contains(event)
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: CacheEvent) {
        self.events.lock().unwrap().push(event);
    }
}
