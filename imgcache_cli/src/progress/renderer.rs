//! Progress rendering for the CLI
//!
//! Turns [`ScopedUpdate`]s into one `indicatif` bar per scope.

use super::provider::ScopedUpdate;
use super::utils::format_summary;
use colored::*;
use imgcache_core::progress::ProgressUpdate;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use tokio::sync::mpsc;

const BAR_TEMPLATE: &str =
    "{prefix:>8.bold} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {percent}% {msg}";

/// Render progress updates from a channel until every sender is gone
pub async fn render_progress(mut rx: mpsc::Receiver<ScopedUpdate>) {
    let mut renderer = ProgressRenderer::new();

    while let Some(scoped) = rx.recv().await {
        renderer.handle_update(scoped);
    }

    renderer.finish();
}

/// Progress renderer that manages visual progress display
pub struct ProgressRenderer {
    multi: MultiProgress,
    bars: HashMap<String, ProgressBar>,
}

impl ProgressRenderer {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: HashMap::new(),
        }
    }

    /// Handle a progress update
    pub fn handle_update(&mut self, scoped: ScopedUpdate) {
        let scope = scoped.scope.unwrap_or_else(|| "images".to_string());

        match scoped.update {
            ProgressUpdate::Item {
                completed,
                total,
                current,
                ..
            } => {
                let bar = self.bar(&scope, total);
                bar.set_position(completed as u64);
                bar.set_message(current);
            }
            ProgressUpdate::Finished {
                successful,
                failed,
                total,
            } => {
                let message = format_summary(successful, failed, total);
                match self.bars.get(&scope) {
                    Some(bar) if failed == 0 => bar.finish_with_message(message.green().to_string()),
                    Some(bar) => bar.finish_with_message(message.yellow().to_string()),
                    None => self.println(format!("{} {message}", "✓".green())),
                }
            }
            ProgressUpdate::Failed { message } => {
                if let Some(bar) = self.bars.get(&scope) {
                    bar.abandon_with_message(message.red().to_string());
                } else {
                    self.println(format!("{} {}", "✗".red(), message.red()));
                }
            }
            ProgressUpdate::Status { message } => {
                self.println(format!("{} {message}", "→".green()));
            }
        }
    }

    /// Number of bars created so far
    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    fn bar(&mut self, scope: &str, total: usize) -> &ProgressBar {
        let multi = &self.multi;
        self.bars.entry(scope.to_string()).or_insert_with(|| {
            let style = ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)
                .map(|style| style.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            let bar = multi.add(ProgressBar::new(total as u64));
            bar.set_style(style);
            bar.set_prefix(scope.to_string());
            bar
        })
    }

    fn println(&self, line: String) {
        if self.multi.println(&line).is_err() {
            eprintln!("{line}");
        }
    }

    /// Finish all progress bars that are still running
    pub fn finish(self) {
        for bar in self.bars.into_values() {
            if !bar.is_finished() {
                bar.finish();
            }
        }
    }
}

impl Default for ProgressRenderer {
    fn default() -> Self {
        Self::new()
    }
}
