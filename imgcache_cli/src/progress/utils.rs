//! Utility functions for progress formatting

use std::time::Duration;

/// Format an elapsed time compactly
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        return format!("{millis}ms");
    }

    let seconds = elapsed.as_secs();
    if seconds < 60 {
        format!("{:.1}s", elapsed.as_secs_f64())
    } else if seconds < 3600 {
        let minutes = seconds / 60;
        let remaining_seconds = seconds % 60;
        if remaining_seconds > 0 {
            format!("{minutes}m {remaining_seconds}s")
        } else {
            format!("{minutes}m")
        }
    } else {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        if minutes > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{hours}h")
        }
    }
}

/// One-line outcome of a preload
pub fn format_summary(successful: usize, failed: usize, total: usize) -> String {
    if failed == 0 {
        format!("{successful}/{total} cached")
    } else {
        format!("{successful}/{total} cached, {failed} failed")
    }
}
