//! Config resolution for knit.
//!
//! [`Resolver::resolve`] turns inline options plus whatever config files apply
//! into a flat list of [`ResolvedConfig`]s, one per package and output format.

pub mod entry;
pub mod env;
pub mod error;
pub mod feature;
pub mod filter;
pub mod glob;
pub mod loader;
mod merge;
pub mod package;
pub mod resolve;
pub mod target;
pub mod types;
pub mod workspace;

pub use error::{ConfigError, Result};
pub use filter::Pattern;
pub use loader::{ConfigExport, ConfigFn, ConfigParser, LoadedConfig, Loader};
pub use package::PackageJson;
pub use resolve::{
    ConfigId, NodeProtocol, Resolution, ResolvedConfig, Resolver, SourcemapMode, WatchTarget,
    resolve_config,
};
pub use types::*;
