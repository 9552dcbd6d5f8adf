//! Terminal output helpers.
//!
//! ```no_run
//! use knit_cli::ui;
//!
//! ui::init_colors(false);
//! ui::success("Build complete");
//! ```

mod format;
mod messages;

pub use format::{format_duration, format_rename};
pub use messages::{error, hint, info, success, warning};

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "CIRCLECI", "TRAVIS"]
        .iter()
        .any(|var| std::env::var_os(var).is_some())
}

/// Whether the user can answer prompts and press shortcut keys.
pub fn is_interactive() -> bool {
    use std::io::IsTerminal;

    !is_ci() && console::user_attended_stderr() && std::io::stdin().is_terminal()
}

/// Enable or disable colored output for the rest of the process.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && crate::logger::should_use_colors();
    owo_colors::set_override(enabled);
    console::set_colors_enabled(enabled);
    console::set_colors_enabled_stderr(enabled);
}
