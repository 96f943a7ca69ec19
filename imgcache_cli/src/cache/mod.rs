//! Cache construction for CLI commands

pub mod factory;

pub use factory::CacheFactory;
