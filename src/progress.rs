//! Progress bar and logging utilities.
//!
//! Interactive runs get an indicatif bar; log-only runs hide it and emit
//! periodic progress lines through `tracing` for tail-friendly output.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;
use tracing::info;

const BAR_TEMPLATE: &str = "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} (ETA: {eta})";
const SPINNER_TEMPLATE: &str = "{msg} {spinner} [{elapsed_precise}]";

/// How batch progress is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressMode {
    #[default]
    Bar,
    LogOnly,
}

impl ProgressMode {
    pub fn from_log_only(log_only: bool) -> Self {
        if log_only {
            ProgressMode::LogOnly
        } else {
            ProgressMode::Bar
        }
    }

    pub fn is_log_only(self) -> bool {
        self == ProgressMode::LogOnly
    }
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Create a progress bar with consistent styling.
/// In log-only mode, the progress bar is hidden.
pub fn create_progress_bar(len: u64, msg: &str, mode: ProgressMode) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if mode.is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.set_message(msg.to_string());
    pb
}

/// Create a spinner for indeterminate progress (source enumeration).
pub fn create_spinner(msg: &str, mode: ProgressMode) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if mode.is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

/// True when a progress line is due: every `interval` items and at the end.
pub fn should_log(current: u64, total: u64, interval: u64) -> bool {
    current == total || (interval > 0 && current % interval == 0)
}

/// Log progress periodically. Only logs in log-only mode.
pub fn log_progress(mode: ProgressMode, phase: &str, current: u64, total: u64, interval: u64) {
    if mode.is_log_only() && total > 0 && should_log(current, total, interval) {
        let pct = 100.0 * current as f64 / total as f64;
        info!("[{}] {}/{} ({:.1}%)", phase, current, total, pct);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_should_log() {
        assert!(should_log(10, 25, 10));
        assert!(!should_log(11, 25, 10));
        assert!(should_log(25, 25, 10));
        assert!(!should_log(3, 5, 0));
    }

    #[test]
    fn test_log_only_bar_is_hidden() {
        let pb = create_progress_bar(3, "Tracks", ProgressMode::LogOnly);
        assert!(pb.is_hidden());
        pb.inc(3);
        assert_eq!(pb.position(), 3);
        assert!(ProgressMode::from_log_only(true).is_log_only());
        assert_eq!(ProgressMode::from_log_only(false), ProgressMode::Bar);
    }
}
