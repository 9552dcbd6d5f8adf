#![cfg_attr(docsrs, feature(doc_cfg))]

//! # knit-bundler
//!
//! Drives a bundling engine through the configs resolved by `knit-config`.
//!
//! Every resolved config becomes one [`Pipeline`]. Pipelines build
//! concurrently; the formats of one package meet at the [`PackageRegistry`]
//! so export maps and package checks run once over all of them.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use knit_bundler::{ExitCode, build, default_engine};
//! use knit_config::{InlineConfig, Loader, Resolver};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = Resolver::new(Arc::new(Loader::new()))?;
//! let (session, _files) = build(
//!     &resolver,
//!     &InlineConfig::default(),
//!     default_engine(),
//!     ExitCode::default(),
//! )
//! .await?;
//! println!("built {} configs", session.pipelines.len());
//! # Ok(()) }
//! ```

pub mod checks;
pub mod chunk;
pub mod clean;
pub mod copy;
pub mod driver;
pub mod engine;
pub mod error;
pub mod exports;
pub mod external;
pub mod hook;
pub mod import_glob;
pub mod latch;
pub mod plan;
pub mod registry;
pub mod report;
pub mod shebang;
pub mod watch;
pub mod watcher;
pub mod writer;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use chunk::{Bundle, Chunk, ChunkKind};
pub use driver::{
    BuildContext, Pipeline, PipelineEvent, Session, build, build_all, build_configs, build_single,
};
pub use engine::{Engine, default_engine};
pub use error::{BuildError, Result};
pub use hook::ExitCode;
pub use latch::CountdownLatch;
pub use plan::BuildPlan;
pub use registry::{PackagePostProcessor, PackageRegistry, PostProcessor};
pub use watch::{WatchCoordinator, WatchHandle};
