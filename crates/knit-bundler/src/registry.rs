//! Per-package rendezvous of build pipelines.
//!
//! Every format of a package builds in its own pipeline, but export maps and
//! package checks need the output of all of them. Pipelines report their
//! bundle to the registry; the last one of a package runs post-processing
//! over every bundle and the others wait for its outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::join_all;
use indexmap::IndexMap;
use knit_config::{Format, ResolvedConfig};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::checks;
use crate::chunk::{Bundle, Chunk};
use crate::error::{BuildError, Result};
use crate::exports::{generate_exports, write_exports};
use crate::latch::{Arrival, CountdownLatch};

/// Runs once per package after every format of it finished building.
#[async_trait]
pub trait PostProcessor: Send + Sync {
    async fn process(&self, manifest: &Path, bundles: &[Arc<Bundle>]) -> Result<()>;
}

type Outcome = std::result::Result<(), Arc<BuildError>>;

#[derive(Default)]
struct Arrived {
    bundles: Vec<Arc<Bundle>>,
    /// A pipeline of this epoch failed before producing a bundle.
    failed: bool,
}

struct PackageGroup {
    latch: CountdownLatch<Outcome>,
    arrived: Mutex<Arrived>,
}

pub struct PackageRegistry {
    groups: FxHashMap<PathBuf, Arc<PackageGroup>>,
    post: Arc<dyn PostProcessor>,
}

impl PackageRegistry {
    /// Group `configs` by their `package.json`. Configs without one are not
    /// tracked.
    pub fn new(configs: &[ResolvedConfig]) -> Self {
        let mut counts: FxHashMap<PathBuf, usize> = FxHashMap::default();
        for config in configs {
            if let Some(manifest) = config.manifest_path() {
                *counts.entry(manifest.to_path_buf()).or_default() += 1;
            }
        }

        let groups = counts
            .into_iter()
            .map(|(manifest, expected)| {
                let group = PackageGroup {
                    latch: CountdownLatch::new(expected),
                    arrived: Mutex::new(Arrived::default()),
                };
                (manifest, Arc::new(group))
            })
            .collect();

        Self {
            groups,
            post: Arc::new(PackagePostProcessor),
        }
    }

    pub fn with_post_processor(mut self, post: Arc<dyn PostProcessor>) -> Self {
        self.post = post;
        self
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of pipelines the package at `manifest` waits for.
    pub fn expected(&self, manifest: &Path) -> Option<usize> {
        self.groups.get(manifest).map(|group| group.latch.expected())
    }

    pub fn is_tracked(&self, config: &ResolvedConfig) -> bool {
        config
            .manifest_path()
            .is_some_and(|manifest| self.groups.contains_key(manifest))
    }

    /// Report a finished pipeline. Resolves once post-processing of its
    /// package completed, with the post-processing outcome.
    pub async fn on_bundle_complete(&self, bundle: Arc<Bundle>) -> Result<()> {
        let Some((manifest, group)) = self.group_of(&bundle.config) else {
            return Ok(());
        };

        group.arrived.lock().bundles.push(bundle);
        let arrival = group
            .latch
            .arrive()
            .map_err(|_| BuildError::Abandoned(manifest.clone()))?;

        match arrival {
            Arrival::Waiting(gate) => match gate.wait().await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(shared)) => Err(BuildError::Shared(shared)),
                Err(_) => Err(BuildError::Abandoned(manifest)),
            },
            Arrival::Last(release) => {
                let Arrived { bundles, failed } = std::mem::take(&mut *group.arrived.lock());
                let outcome = if failed {
                    tracing::debug!("Skipping post-processing of {}", manifest.display());
                    Err(Arc::new(BuildError::Abandoned(manifest)))
                } else {
                    tracing::debug!(
                        "Post-processing {} with {} bundles",
                        manifest.display(),
                        bundles.len()
                    );
                    self.post.process(&manifest, &bundles).await.map_err(Arc::new)
                };
                release.open(outcome.clone());
                outcome.map_err(BuildError::Shared)
            }
        }
    }

    /// Report a pipeline that failed before producing a bundle. Its package
    /// skips post-processing for this epoch and pending siblings are
    /// released with [`BuildError::Abandoned`].
    pub fn on_bundle_failed(&self, config: &ResolvedConfig) {
        let Some((manifest, group)) = self.group_of(config) else {
            return;
        };

        let arrival = {
            let mut arrived = group.arrived.lock();
            arrived.failed = true;
            group.latch.arrive()
        };
        if let Ok(Arrival::Last(release)) = arrival {
            group.arrived.lock().bundles.clear();
            release.open(Err(Arc::new(BuildError::Abandoned(manifest))));
        }
    }

    fn group_of(&self, config: &ResolvedConfig) -> Option<(PathBuf, Arc<PackageGroup>)> {
        let manifest = config.manifest_path()?;
        match self.groups.get(manifest) {
            Some(group) => Some((manifest.to_path_buf(), Arc::clone(group))),
            None => {
                tracing::debug!("{} is not tracked by the registry", manifest.display());
                None
            }
        }
    }

    /// Start a new build epoch for one package.
    pub fn reset(&self, manifest: &Path) {
        if let Some(group) = self.groups.get(manifest) {
            *group.arrived.lock() = Arrived::default();
            group.latch.reset();
        }
    }
}

/// Export maps plus `publint` and `attw`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PackagePostProcessor;

#[async_trait]
impl PostProcessor for PackagePostProcessor {
    async fn process(&self, manifest: &Path, bundles: &[Arc<Bundle>]) -> Result<()> {
        let configs: Vec<&ResolvedConfig> = bundles.iter().map(|bundle| &*bundle.config).collect();

        let exports_configs = dedupe(&configs, |config| config.exports.as_ref(), |options| {
            options.is_customized()
        });
        if exports_configs.len() > 1 {
            return Err(BuildError::ConflictingExports {
                path: manifest.to_path_buf(),
                options: exports_configs
                    .iter()
                    .map(|config| serde_json::to_string(&config.exports).unwrap_or_default())
                    .collect(),
            });
        }
        if let Some(config) = exports_configs.first() {
            if let (Some(pkg), Some(options)) = (config.pkg.as_deref(), config.exports.as_ref()) {
                let chunks = merge_chunks(bundles.iter().filter(|b| b.config.exports.is_some()));
                let by_format: Vec<(Format, &[Chunk])> = chunks
                    .iter()
                    .map(|(format, chunks)| (*format, chunks.as_slice()))
                    .collect();
                let generated = generate_exports(pkg, &by_format, options);
                write_exports(pkg.path(), &generated)?;
            }
        }

        let publint_configs = dedupe(&configs, |config| config.publint.as_ref(), |options| {
            options.level.is_some() || options.strict.is_some()
        });
        let attw_configs = dedupe(&configs, |config| config.attw.as_ref(), |options| {
            options.profile.is_some() || options.level.is_some()
        });
        if publint_configs.len() > 1 || attw_configs.len() > 1 {
            tracing::warn!(
                "Multiple publint or attw configurations found for package at {}. Consider merging them for better consistency and performance.",
                manifest.display()
            );
        }

        let package_dir = manifest.parent().unwrap_or(manifest);
        let package = |config: &ResolvedConfig| {
            config
                .pkg
                .as_deref()
                .and_then(|pkg| pkg.name())
                .map(String::from)
                .unwrap_or_else(|| config.label())
        };

        let mut runs = Vec::new();
        for config in &publint_configs {
            if let Some(options) = &config.publint {
                let name = package(config);
                runs.push(
                    async move {
                        checks::publint(&name, package_dir, options, config.fail_on_warn).await
                    }
                    .boxed(),
                );
            }
        }
        for config in &attw_configs {
            if let Some(options) = &config.attw {
                let name = package(config);
                runs.push(
                    async move {
                        checks::attw(&name, package_dir, options, config.fail_on_warn).await
                    }
                    .boxed(),
                );
            }
        }

        // Every check runs to completion; the first failure is reported.
        join_all(runs).await.into_iter().collect::<Result<Vec<()>>>()?;
        Ok(())
    }
}

/// Configs carrying option `T`, one per distinct customized value. When no
/// config customizes it, the first one stands in for all.
fn dedupe<'a, T: PartialEq>(
    configs: &[&'a ResolvedConfig],
    get: impl Fn(&ResolvedConfig) -> Option<&T>,
    customized: impl Fn(&T) -> bool,
) -> Vec<&'a ResolvedConfig> {
    let enabled: Vec<&'a ResolvedConfig> = configs
        .iter()
        .copied()
        .filter(|config| get(*config).is_some())
        .collect();
    let Some(first) = enabled.first().copied() else {
        return Vec::new();
    };

    let mut distinct: Vec<&'a ResolvedConfig> = Vec::new();
    for config in enabled.iter().copied() {
        let Some(options) = get(config) else { continue };
        if !customized(options) {
            continue;
        }
        if !distinct.iter().any(|seen| get(*seen) == Some(options)) {
            distinct.push(config);
        }
    }

    if distinct.is_empty() {
        vec![first]
    } else {
        distinct
    }
}

/// Chunks of every bundle grouped by format. Within a format, a later chunk
/// replaces an earlier one with the same output path.
fn merge_chunks<'a>(
    bundles: impl Iterator<Item = &'a Arc<Bundle>>,
) -> IndexMap<Format, Vec<Chunk>> {
    let mut merged: IndexMap<Format, Vec<Chunk>> = IndexMap::new();
    for bundle in bundles {
        let target = merged.entry(bundle.config.format).or_default();
        for chunk in &bundle.chunks {
            match target.iter_mut().find(|existing| existing.path() == chunk.path()) {
                Some(existing) => *existing = chunk.clone(),
                None => target.push(chunk.clone()),
            }
        }
    }
    merged
}
