//! Mock implementations for testing

mod clock;
mod events;
mod prefetch;
mod progress;
mod storage;

pub use clock::ManualClock;
pub use events::RecordingSink;
pub use prefetch::MockPrefetcher;
pub use progress::RecordingProgress;
pub use storage::MockStorageBackend;
