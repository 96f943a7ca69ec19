//! Progress reporting module for the CLI
//!
//! Core preloads report through [`ChannelProvider`]; a separate task renders
//! the updates with `indicatif`.

pub mod provider;
pub mod renderer;
pub mod utils;

pub use provider::{ChannelProvider, ScopedUpdate, create_progress_infrastructure};
pub use renderer::{ProgressRenderer, render_progress};
pub use utils::{format_elapsed, format_summary};
