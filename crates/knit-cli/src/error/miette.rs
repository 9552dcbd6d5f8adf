//! Conversion of CLI errors to miette reports.

use miette::{MietteDiagnostic, Report};

use crate::error::{BuildError, CliError, ConfigError};

/// Convert a [`CliError`] to a miette report with a help line where one is known.
pub fn cli_error_to_miette(err: CliError) -> Report {
    let help = match &err {
        CliError::Build(e) => build_help(e.root()),
        CliError::Config(e) => config_help(e),
        CliError::Migrate(_) => Some("Run `knit migrate` from the project root"),
        _ => None,
    };

    let mut diagnostic = MietteDiagnostic::new(err.to_string()).with_code(code(&err));
    if let Some(help) = help {
        diagnostic = diagnostic.with_help(help);
    }
    Report::new(diagnostic)
}

fn code(err: &CliError) -> &'static str {
    match err {
        CliError::Config(_) | CliError::Build(BuildError::Config(_)) => "knit::config",
        CliError::Build(_) => "knit::build",
        CliError::Migrate(_) => "knit::migrate",
        _ => "knit",
    }
}

fn build_help(err: &BuildError) -> Option<&'static str> {
    match err {
        BuildError::Config(e) => config_help(e),
        BuildError::ConflictingExports { .. } => {
            Some("Use the same `exports` options for every format of a package")
        }
        BuildError::InvalidOutputPath(_) => Some("Output paths must stay inside `outDir`"),
        BuildError::Check { .. } => Some("Fix the reported issues or disable the check"),
        _ => None,
    }
}

fn config_help(err: &ConfigError) -> Option<&'static str> {
    match err {
        ConfigError::NoEntry | ConfigError::EntryNotFound(_) => {
            Some("Pass entry files on the command line or set `entry` in knit.config.ts")
        }
        ConfigError::NoPackagesMatched => Some("Check the --filter patterns"),
        _ => None,
    }
}
