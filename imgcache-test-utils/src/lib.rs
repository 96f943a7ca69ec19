//! Test utilities for the image cache
//!
//! This crate provides mock implementations, test builders, and fixtures
//! for testing image cache functionality.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::TestDataBuilder;
pub use mocks::{
    ManualClock, MockPrefetcher, MockStorageBackend, RecordingProgress, RecordingSink,
};
