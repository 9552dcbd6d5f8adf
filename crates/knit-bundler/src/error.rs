use std::path::PathBuf;
use std::sync::Arc;

use knit_config::ConfigError;
use thiserror::Error;

/// Error types for knit-bundler operations.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Config resolution failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The bundling engine rejected a build.
    #[error("{label} build failed: {message}")]
    Engine { label: String, message: String },

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// Formats of one package disagree on export map generation.
    #[error(
        "Conflicting exports options for package at {}. Please merge them:\n{}",
        .path.display(),
        bullet_list(.options)
    )]
    ConflictingExports { path: PathBuf, options: Vec<String> },

    #[error(
        "Watch is enabled but the output directory is the working directory ({0}).\n\nHint: set `outDir` to a subdirectory or pass explicit paths to `watch`"
    )]
    WatchOutDirIsCwd(PathBuf),

    /// A package check (publint, attw) reported errors at error level.
    #[error("[{tool}] {package}: {message}")]
    Check {
        tool: &'static str,
        package: String,
        message: String,
    },

    /// The engine warned while `failOnWarn` is set.
    #[error("{label} build emitted {count} warning(s) and `failOnWarn` is enabled")]
    Warnings { label: String, count: usize },

    /// A pipeline of the package went away before the group completed.
    #[error("Build of package at {} was abandoned before every format completed", .0.display())]
    Abandoned(PathBuf),

    /// Failure of package post-processing, observed by every format of the package.
    #[error(transparent)]
    Shared(#[from] Arc<BuildError>),

    #[error("onSuccess callback failed: {0}")]
    Hook(String),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Invalid package.json: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    pub fn engine(label: impl Into<String>, message: impl Into<String>) -> Self {
        BuildError::Engine {
            label: label.into(),
            message: message.into(),
        }
    }

    /// The underlying error when this one wraps a shared failure.
    pub fn root(&self) -> &BuildError {
        match self {
            BuildError::Shared(inner) => inner.root(),
            other => other,
        }
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type for knit-bundler operations.
pub type Result<T> = std::result::Result<T, BuildError>;
