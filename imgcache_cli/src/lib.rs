//! imgcache command-line client
//!
//! Wires the `imgcache_core` cache to a file-backed store, an HTTP
//! prefetcher and layered configuration.

pub mod cache;
pub mod config;
pub mod error;
pub mod output;
pub mod paths;
pub mod prefetch;
pub mod progress;
pub mod terminal;
