//! Progress provider implementation for CLI
//!
//! Bridges the core library's progress reporting with the CLI's rendering
//! task through a bounded channel.

use imgcache_core::progress::{ProgressProvider, ProgressUpdate};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Updates buffered between the reporter and the renderer
const CHANNEL_CAPACITY: usize = 256;

/// A progress update tagged with the provider it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedUpdate {
    /// `None` for the root provider, `"local"`, `"remote"` or a nested path for children
    pub scope: Option<String>,
    pub update: ProgressUpdate,
}

/// Channel-based progress provider for CLI rendering
///
/// Sending never blocks; updates are dropped if the renderer falls behind or
/// has gone away.
pub struct ChannelProvider {
    tx: Mutex<Option<mpsc::Sender<ScopedUpdate>>>,
    name: Option<String>,
}

impl ChannelProvider {
    pub fn new(tx: mpsc::Sender<ScopedUpdate>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
            name: None,
        }
    }

    pub fn with_name(tx: mpsc::Sender<ScopedUpdate>, name: String) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
            name: Some(name),
        }
    }

    fn sender(&self) -> Option<mpsc::Sender<ScopedUpdate>> {
        match self.tx.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ProgressProvider for ChannelProvider {
    fn report(&self, update: ProgressUpdate) {
        if let Some(tx) = self.sender() {
            let _ = tx.try_send(ScopedUpdate {
                scope: self.name.clone(),
                update,
            });
        }
    }

    fn create_child(&self, name: &str) -> Box<dyn ProgressProvider> {
        let child_name = match &self.name {
            Some(parent_name) => format!("{parent_name}/{name}"),
            None => name.to_string(),
        };
        Box::new(Self {
            tx: Mutex::new(self.sender()),
            name: Some(child_name),
        })
    }

    fn complete(&self) {
        // Drop our sender so the renderer can exit its loop
        match self.tx.lock() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

/// Create a progress provider and the receiver its updates arrive on
pub fn create_progress_infrastructure() -> (Arc<dyn ProgressProvider>, mpsc::Receiver<ScopedUpdate>)
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let provider = Arc::new(ChannelProvider::new(tx)) as Arc<dyn ProgressProvider>;
    (provider, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_children_are_scoped_and_complete_closes() {
        let (provider, mut rx) = create_progress_infrastructure();

        let local = provider.create_child("local");
        local.report(ProgressUpdate::item(1, 2, "logo-full"));
        provider.report(ProgressUpdate::Status {
            message: "starting".to_string(),
        });
        local.complete();
        drop(local);
        provider.complete();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.scope.as_deref(), Some("local"));
        assert_eq!(first.update, ProgressUpdate::item(1, 2, "logo-full"));

        let second = rx.recv().await.unwrap();
        assert_eq!(second.scope, None);

        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_report_after_complete_is_dropped() {
        let (tx, mut rx) = mpsc::channel(4);
        let provider = ChannelProvider::with_name(tx, "remote".to_string());
        provider.complete();
        provider.report(ProgressUpdate::item(1, 1, "x"));

        assert!(rx.recv().await.is_none());
    }
}
