//! Periodic expiry sweep

use crate::cache::ImageCacheCore;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

/// Background task evicting expired entries on a fixed period
///
/// The task holds only a weak reference to the cache and stops on its own
/// once the cache is gone. Dropping the handle stops it immediately.
pub struct ExpirySweeper {
    handle: JoinHandle<()>,
}

impl ExpirySweeper {
    /// Start sweeping `core` every `period`, first sweep one period from now
    pub fn spawn(core: &Arc<ImageCacheCore>, period: Duration) -> Self {
        let core: Weak<ImageCacheCore> = Arc::downgrade(core);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;

                let Some(core) = core.upgrade() else {
                    break;
                };
                let removed = core.evict_expired().await;
                if removed > 0 {
                    log::debug!("Expiry sweep removed {removed} entries");
                }
            }
        });

        Self { handle }
    }

    /// Whether the sweep task is still running
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the sweep
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
