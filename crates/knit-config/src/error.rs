//! Error types for configuration loading and resolution.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Config file loading
    #[error("failed to parse config file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error(
        "failed to load the config file {}: {message}\n\nHint: try setting the --config-loader flag to `{suggestion}`",
        .path.display()
    )]
    ModuleNotFound {
        path: PathBuf,
        message: String,
        suggestion: &'static str,
    },

    #[error("config evaluation failed for {}: {message}", .path.display())]
    Evaluation { path: PathBuf, message: String },

    #[error("unsupported config file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("a config array must only contain config objects, found a function at index {index}")]
    FunctionInArray { index: usize },

    #[error("a config function must return a config object or an array of config objects")]
    NestedFunction,

    #[error("invalid value for `{field}`: {message}")]
    InvalidValue { field: String, message: String },

    // Deprecated/canonical pairs
    #[error("`{deprecated}` is deprecated. Please only use `{canonical}` instead.")]
    DeprecatedConflict {
        deprecated: &'static str,
        canonical: &'static str,
    },

    // Workspace
    #[error("No workspace packages found, please check your config")]
    NoWorkspacePackages,

    #[error("No packages matched the filters")]
    NoPackagesMatched,

    // Entries
    #[error("No input files, try \"knit <your-file>\" or create src/index.ts")]
    NoEntry,

    #[error("Cannot find entry: {0}")]
    EntryNotFound(String),

    #[error("entry `{key}` is not a glob pattern, so it must map to a single file")]
    EntryNotGlob { key: String },

    #[error("entry `{key}` must have exactly one positive glob pattern, found {count}")]
    EntryPatternCount { key: String, count: usize },

    #[error("invalid glob pattern `{pattern}`: {message}")]
    Glob { pattern: String, message: String },

    #[error("invalid regular expression `{pattern}`: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    // Package manifest
    #[error("invalid package.json at {}: {message}", .path.display())]
    InvalidManifest { path: PathBuf, message: String },

    #[error("`package.json` not found, cannot write exports (looked from {})", .0.display())]
    ManifestRequired(PathBuf),

    #[error("failed to read env file {}: {message}", .path.display())]
    EnvFile { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        ConfigError::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, message: impl ToString) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            message: message.to_string(),
        }
    }
}
