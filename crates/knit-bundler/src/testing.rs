//! Helpers for testing pipelines without a real bundler.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use knit_config::{InlineConfig, Loader, ResolvedConfig, Resolver, UserConfig};
use parking_lot::Mutex;

use crate::chunk::Chunk;
use crate::engine::{Engine, report_warnings};
use crate::error::{BuildError, Result};
use crate::plan::{BuildPlan, PluginDescriptor};

/// Emits one entry chunk per planned entry (plus a declaration chunk when
/// declarations are planned) and remembers every plan it saw.
#[derive(Default)]
pub struct RecordingEngine {
    plans: Mutex<Vec<BuildPlan>>,
    fail_label: Option<String>,
    warnings: Vec<String>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every build whose plan label equals `label`.
    pub fn failing(label: impl Into<String>) -> Self {
        Self {
            fail_label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Report `warnings` from every build.
    pub fn with_warnings(mut self, warnings: &[&str]) -> Self {
        self.warnings = warnings.iter().map(|w| w.to_string()).collect();
        self
    }

    pub fn plans(&self) -> Vec<BuildPlan> {
        self.plans.lock().clone()
    }
}

#[async_trait]
impl Engine for RecordingEngine {
    async fn build(&self, plan: &BuildPlan) -> Result<Vec<Chunk>> {
        self.plans.lock().push(plan.clone());
        if self.fail_label.as_deref() == Some(plan.label.as_str()) {
            return Err(BuildError::engine(&plan.label, "recorded failure"));
        }
        report_warnings(plan, &self.warnings)?;

        let dts = plan
            .input
            .plugins
            .iter()
            .any(|plugin| matches!(plugin, PluginDescriptor::Dts { .. }));
        let mut chunks = Vec::new();
        for entry in &plan.input.entries {
            let facade = entry.import.to_string_lossy().into_owned();
            if !plan.output.dts_only {
                let file_name = format!("{}.{}", entry.name, plan.output.extension);
                let source = format!("// {} {}\n", plan.output.format, entry.name);
                chunks.push(
                    Chunk::chunk(file_name, source).with_entry(entry.name.as_str(), facade.as_str()),
                );
            }
            if dts {
                let file_name = format!("{}.{}", entry.name, plan.output.dts_extension);
                chunks.push(
                    Chunk::chunk(file_name, "export {};\n")
                        .with_entry(format!("{}.d", entry.name), facade),
                );
            }
        }
        Ok(chunks)
    }
}

/// Write `content` to `root/rel`, creating parent directories.
pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Resolve `config` as if it was loaded from a config file in `cwd`.
pub fn resolve(cwd: &Path, config: UserConfig) -> Vec<ResolvedConfig> {
    Resolver::new(Arc::new(Loader::new()))
        .unwrap()
        .with_cwd(cwd)
        .with_ci(false)
        .resolve_user_config(config, &InlineConfig::default())
        .unwrap()
}
