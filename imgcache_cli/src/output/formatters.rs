use super::OutputFormatter;
use crate::progress::format_summary;
use anyhow::Result;
use colored::*;
use imgcache_core::{CacheStats, CombinedReport, ImageData, PreloadReport};
use serde::Serialize;

/// Text formatter for human-readable output
pub struct TextFormatter {
    use_color: bool,
}

impl TextFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn colorize(&self, text: &str, color: fn(&str) -> ColoredString) -> String {
        if self.use_color {
            color(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn push_failures(&self, output: &mut String, report: &PreloadReport) {
        for failure in &report.errors {
            let key = self.colorize(&failure.key, |s| s.red());
            output.push_str(&format!("  {key}: {}\n", failure.error));
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format_report(&self, report: &PreloadReport) -> Result<String> {
        let mut output = String::new();
        let summary = format_summary(report.successful, report.failed, report.total);
        let summary = if report.failed == 0 {
            self.colorize(&summary, |s| s.green())
        } else {
            self.colorize(&summary, |s| s.yellow())
        };
        output.push_str(&format!("{summary}\n"));
        self.push_failures(&mut output, report);
        Ok(output)
    }

    fn format_combined(&self, report: &CombinedReport) -> Result<String> {
        let mut output = String::new();
        for (label, part) in [("Local", &report.local), ("Remote", &report.remote)] {
            let label = self.colorize(label, |s| s.bold());
            output.push_str(&format!(
                "{label}: {}\n",
                format_summary(part.successful, part.failed, part.total)
            ));
            self.push_failures(&mut output, part);
        }
        output.push_str(&format!(
            "Total: {}\n",
            format_summary(report.successful, report.failed, report.total)
        ));
        Ok(output)
    }

    fn format_stats(&self, stats: &CacheStats) -> Result<String> {
        let mut output = String::new();
        output.push_str(&format!("Entries: {}\n", stats.total));
        output.push_str(&format!(
            "Valid:   {}\n",
            self.colorize(&stats.valid.to_string(), |s| s.green())
        ));
        output.push_str(&format!(
            "Expired: {}\n",
            self.colorize(&stats.expired.to_string(), |s| s.yellow())
        ));

        if !stats.valid_keys.is_empty() {
            output.push_str("\nValid keys:\n");
            for key in &stats.valid_keys {
                output.push_str(&format!("  {}\n", self.colorize(key, |s| s.cyan())));
            }
        }
        if !stats.expired_keys.is_empty() {
            output.push_str("\nExpired keys:\n");
            for key in &stats.expired_keys {
                output.push_str(&format!("  {key}\n"));
            }
        }
        Ok(output)
    }

    fn format_entry(&self, key: &str, data: Option<&ImageData>) -> Result<String> {
        let line = match data {
            Some(ImageData::Remote { uri }) => format!("{key}: remote {uri}"),
            Some(ImageData::Local { asset }) => format!("{key}: local {asset}"),
            None => format!("{key}: {}", self.colorize("not cached", |s| s.yellow())),
        };
        Ok(format!("{line}\n"))
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(format!("{json}\n"))
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &PreloadReport) -> Result<String> {
        self.render(report)
    }

    fn format_combined(&self, report: &CombinedReport) -> Result<String> {
        self.render(report)
    }

    fn format_stats(&self, stats: &CacheStats) -> Result<String> {
        self.render(stats)
    }

    fn format_entry(&self, key: &str, data: Option<&ImageData>) -> Result<String> {
        self.render(&serde_json::json!({
            "key": key,
            "cached": data.is_some(),
            "data": data,
        }))
    }
}
