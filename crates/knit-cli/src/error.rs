//! Error handling for the knit CLI.
//!
//! Library errors convert into [`CliError`] through `#[from]`; `main` turns
//! the final error into a miette report.

mod miette;

use std::path::PathBuf;

use thiserror::Error;

pub use knit_bundler::BuildError;
pub use knit_config::ConfigError;

pub use self::miette::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    /// Invalid command-line arguments or settings
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid package.json: {0}")]
    Json(#[from] serde_json::Error),

    /// Nothing to migrate, or the user declined.
    #[error("{0}")]
    Migrate(String),
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Attach the offending path to I/O errors.
pub trait ResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| CliError::Read {
            path: path.into(),
            source,
        })
    }
}
