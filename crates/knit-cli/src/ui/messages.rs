//! Status messages on stderr.

use owo_colors::{OwoColorize, Stream::Stderr};

pub fn success(message: &str) {
    eprintln!("{} {}", "✓".if_supports_color(Stderr, |s| s.green()), message);
}

pub fn info(message: &str) {
    eprintln!("{} {}", "ℹ".if_supports_color(Stderr, |s| s.blue()), message);
}

pub fn warning(message: &str) {
    eprintln!(
        "{} {}",
        "⚠".if_supports_color(Stderr, |s| s.yellow()),
        message.if_supports_color(Stderr, |s| s.yellow())
    );
}

pub fn error(message: &str) {
    eprintln!(
        "{} {}",
        "✗".if_supports_color(Stderr, |s| s.red()),
        message.if_supports_color(Stderr, |s| s.red())
    );
}

/// Dimmed hint line, e.g. the keyboard shortcuts of watch mode.
pub fn hint(message: &str) {
    eprintln!("  {}", message.if_supports_color(Stderr, |s| s.dimmed()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages() {
        success("Success message");
        info("Info message");
        warning("Warning message");
        error("Error message");
        hint("Hint message");
    }
}
