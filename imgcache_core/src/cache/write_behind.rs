//! Debounced snapshot writer
//!
//! One background task per cache. Mutations send `Dirty`; the task waits for
//! a quiet period (re-armed by every further signal) and then saves the
//! current map exactly once. A pending count reaching the flush threshold,
//! an explicit flush, or the cache being dropped cut the wait short.

use crate::cache::core::CacheMap;
use crate::storage::PersistentStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc, oneshot};

enum Signal {
    Dirty,
    Flush(oneshot::Sender<()>),
}

/// Handle to the write-behind task
///
/// Dropping the handle closes the channel; the task then writes any pending
/// changes and exits.
pub(crate) struct WriteBehind {
    tx: mpsc::UnboundedSender<Signal>,
}

impl WriteBehind {
    /// Spawn the writer on the current Tokio runtime
    pub(crate) fn spawn(
        map: Arc<RwLock<CacheMap>>,
        store: Arc<PersistentStore>,
        window: Duration,
        threshold: usize,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx, map, store, window, threshold.max(1)));
        Self { tx }
    }

    /// Record that the map changed
    pub(crate) fn mark_dirty(&self) {
        let _ = self.tx.send(Signal::Dirty);
    }

    /// Save the current map now and wait for the save to finish
    pub(crate) async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Signal::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<Signal>,
    map: Arc<RwLock<CacheMap>>,
    store: Arc<PersistentStore>,
    window: Duration,
    threshold: usize,
) {
    while let Some(signal) = rx.recv().await {
        let mut acks = Vec::new();

        match signal {
            Signal::Flush(ack) => acks.push(ack),
            Signal::Dirty => {
                let mut pending = 1;
                while pending < threshold {
                    tokio::select! {
                        _ = tokio::time::sleep(window) => break,
                        next = rx.recv() => match next {
                            Some(Signal::Dirty) => pending += 1,
                            Some(Signal::Flush(ack)) => {
                                acks.push(ack);
                                break;
                            }
                            None => break,
                        },
                    }
                }
                log::debug!("Writing image cache snapshot after {pending} change(s)");
            }
        }

        persist(&map, &store).await;

        for ack in acks {
            let _ = ack.send(());
        }
    }
}

async fn persist(map: &RwLock<CacheMap>, store: &PersistentStore) {
    let snapshot = {
        let map = map.read().await;
        if !map.is_ready() {
            // Never overwrite the stored snapshot before it has been read
            return;
        }
        map.snapshot()
    };
    store.save(&snapshot).await;
}
