//! The bundling engine boundary.
//!
//! Pipelines hand the engine a [`BuildPlan`] and get chunks back. The engine
//! never writes to disk; writing, post-processing and hooks belong to the
//! driver.

use std::sync::Arc;

use async_trait::async_trait;

use crate::chunk::Chunk;
use crate::error::{BuildError, Result};
use crate::plan::BuildPlan;

#[cfg(feature = "dts-generation")]
mod dts;
#[cfg(feature = "rolldown")]
mod plugins;
#[cfg(feature = "rolldown")]
mod rolldown;

#[cfg(feature = "rolldown")]
pub use self::rolldown::RolldownEngine;

/// Turns a build plan into output chunks.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn build(&self, plan: &BuildPlan) -> Result<Vec<Chunk>>;
}

#[async_trait]
impl<E: Engine + ?Sized> Engine for Arc<E> {
    async fn build(&self, plan: &BuildPlan) -> Result<Vec<Chunk>> {
        (**self).build(plan).await
    }
}

/// Log the engine's warnings for `plan`. Under `failOnWarn` any warning
/// fails the build.
pub fn report_warnings<W: std::fmt::Display>(plan: &BuildPlan, warnings: &[W]) -> Result<()> {
    for warning in warnings {
        tracing::warn!("[{}] {warning}", plan.label);
    }
    if plan.fail_on_warn && !warnings.is_empty() {
        return Err(BuildError::Warnings {
            label: plan.label.clone(),
            count: warnings.len(),
        });
    }
    Ok(())
}

/// The engine knit builds with by default.
#[cfg(feature = "rolldown")]
pub fn default_engine() -> Arc<dyn Engine> {
    Arc::new(RolldownEngine::new())
}

/// Without the `rolldown` feature there is nothing to build with.
#[cfg(not(feature = "rolldown"))]
pub fn default_engine() -> Arc<dyn Engine> {
    Arc::new(Unavailable)
}

#[cfg(not(feature = "rolldown"))]
struct Unavailable;

#[cfg(not(feature = "rolldown"))]
#[async_trait]
impl Engine for Unavailable {
    async fn build(&self, plan: &BuildPlan) -> Result<Vec<Chunk>> {
        Err(BuildError::engine(
            &plan.label,
            "knit was compiled without the `rolldown` feature",
        ))
    }
}
