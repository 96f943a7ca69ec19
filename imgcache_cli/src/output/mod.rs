mod formatters;

pub use formatters::{JsonFormatter, TextFormatter};

use anyhow::Result;
use imgcache_core::{CacheStats, CombinedReport, ImageData, PreloadReport};

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Parse output format from string
    pub fn from_string(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!("Unknown output format: {}", s),
        }
    }
}

/// Renders command results for the user
pub trait OutputFormatter: Send + Sync {
    /// Outcome of a local or remote preload
    fn format_report(&self, report: &PreloadReport) -> Result<String>;

    /// Outcome of a local-then-remote preload
    fn format_combined(&self, report: &CombinedReport) -> Result<String>;

    fn format_stats(&self, stats: &CacheStats) -> Result<String>;

    /// A single lookup; `None` when the key is absent or expired
    fn format_entry(&self, key: &str, data: Option<&ImageData>) -> Result<String>;
}

/// Create a formatter based on output format
pub fn create_formatter(format: OutputFormat, use_color: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(use_color)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}
