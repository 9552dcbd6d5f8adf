//! Command implementations for the knit CLI.
//!
//! - [`build`] - Resolve configs and build them, optionally watching
//! - [`migrate`] - Move a tsup project over to knit
//!
//! Each command provides an `execute` function returning the process exit
//! code.

pub mod build;
pub mod migrate;
pub(crate) mod utils;

pub use build::execute as build_execute;
pub use migrate::execute as migrate_execute;
