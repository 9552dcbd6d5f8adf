//! Formatting helpers for terminal output.

use std::path::Path;
use std::time::Duration;

use owo_colors::{OwoColorize, Stream::Stderr};

/// Format a duration with the most appropriate unit.
///
/// ```
/// use std::time::Duration;
/// use knit_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{total_ms}ms")
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// `from → to`, relative to `root` when possible.
pub fn format_rename(root: &Path, from: &Path, to: &Path) -> String {
    let rel = |path: &Path| {
        path.strip_prefix(root)
            .unwrap_or(path)
            .display()
            .to_string()
    };
    let to = rel(to);
    format!(
        "{} {} {}",
        rel(from),
        "→".if_supports_color(Stderr, |s| s.dimmed()),
        to.if_supports_color(Stderr, |s| s.bold())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_milliseconds() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
    }

    #[test]
    fn test_format_duration_seconds() {
        assert_eq!(format_duration(Duration::from_millis(1000)), "1.00s");
        assert_eq!(format_duration(Duration::from_millis(59_999)), "60.00s");
    }

    #[test]
    fn test_format_duration_minutes() {
        assert_eq!(format_duration(Duration::from_secs(60)), "1m 0s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_format_rename_is_relative() {
        let line = format_rename(
            Path::new("/repo"),
            Path::new("/repo/tsup.config.ts"),
            Path::new("/repo/knit.config.ts"),
        );
        assert!(line.contains("tsup.config.ts"));
        assert!(line.contains("knit.config.ts"));
        assert!(!line.contains("/repo"));
    }
}
