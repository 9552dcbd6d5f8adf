//! Knit CLI - build JavaScript/TypeScript libraries and monorepos.
//!
//! The library half of the `knit` binary, exposed for integration tests.
//!
//! - [`cli`] - Argument definitions
//! - [`commands`] - `build` and `migrate`
//! - [`config`] - `KNIT_*` settings and flag translation
//! - [`error`] - Error types and miette reporting
//! - [`logger`] - Tracing setup
//! - [`ui`] - Terminal output

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
mod shortcuts;
pub mod ui;

pub use error::{CliError, Result};
