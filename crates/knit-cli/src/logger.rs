//! Logging infrastructure for the knit CLI.
//!
//! Built on the `tracing` ecosystem. The filter can be narrowed once the
//! configs are resolved, so a `logLevel` from a config file applies to the
//! rest of the run.
//!
//! # Example
//!
//! ```rust,no_run
//! use knit_cli::logger::init_logger;
//! use tracing::info;
//!
//! init_logger(false, false, false);
//! info!("Starting build");
//! ```

use std::sync::OnceLock;

use knit_config::LogLevel;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

const CRATES: &[&str] = &["knit", "knit_cli", "knit_bundler", "knit_config"];

struct LogState {
    handle: reload::Handle<EnvFilter, Registry>,
    /// `--verbose`, `--quiet` or `RUST_LOG` decided the filter.
    explicit: bool,
}

static STATE: OnceLock<LogState> = OnceLock::new();

/// Initialize the tracing subscriber.
///
/// The level is determined in this order:
/// 1. `--verbose`: DEBUG for knit crates
/// 2. `--quiet`: ERROR only
/// 3. `RUST_LOG`
/// 4. INFO for knit crates, possibly lowered later by [`apply_log_level`]
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let (filter, explicit) = if verbose {
        (crate_filter("debug"), true)
    } else if quiet {
        (crate_filter("error"), true)
    } else {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => (filter, true),
            Err(_) => (crate_filter("info"), false),
        }
    };

    let (filter, handle) = reload::Layer::new(filter);

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    let initialized = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok();

    if initialized {
        let _ = STATE.set(LogState { handle, explicit });
    }
}

/// Apply the `logLevel` of the resolved configs.
///
/// Ignored when the level was chosen on the command line or through
/// `RUST_LOG`.
pub fn apply_log_level(level: LogLevel) {
    let Some(state) = STATE.get() else {
        return;
    };
    if state.explicit {
        return;
    }
    if let Err(e) = state.handle.reload(crate_filter(directive(level))) {
        tracing::debug!("Failed to update the log filter: {e}");
    }
}

fn directive(level: LogLevel) -> &'static str {
    match level {
        // errors are still printed, only through miette instead of the log
        LogLevel::Silent => "off",
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
    }
}

fn crate_filter(level: &str) -> EnvFilter {
    let directives: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
    EnvFilter::new(directives.join(","))
}

/// Check if colored output should be enabled.
///
/// `NO_COLOR` disables colors, `FORCE_COLOR` forces them even without a TTY.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}
