//! Watch mode.
//!
//! Every package group gets its own task that watches the paths of its
//! pipelines, debounces changes and rebuilds the whole group, so a registry
//! reset never lands in the middle of a rendezvous. Changes to config files,
//! manifests, tsconfig or pnpm files restart everything instead.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use knit_config::{InlineConfig, ResolvedConfig, Resolver};
use regex::Regex;
use rustc_hash::FxHashMap;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::clean;
use crate::driver::{self, Pipeline, Session};
use crate::engine::Engine;
use crate::error::{BuildError, Result};
use crate::hook::ExitCode;
use crate::registry::PackageRegistry;
use crate::watcher::{FileWatcher, IgnoreRules, watch_paths};

pub const DEBOUNCE: Duration = Duration::from_millis(100);

const CHANNEL_CAPACITY: usize = 256;

static RESTART_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\\/](?:(?:package|tsconfig)\.json|pnpm-(?:workspace|lock)\.yaml|knit\.config[^\\/]*)$")
        .expect("restart pattern is valid")
});

/// Whether a change to `path` requires resolving configs again.
pub fn needs_restart(path: &Path, config_files: &[PathBuf]) -> bool {
    config_files.iter().any(|file| file == path)
        || RESTART_PATTERN.is_match(&path.to_string_lossy())
}

/// Remote control of a running [`WatchCoordinator`].
#[derive(Clone, Default)]
pub struct WatchHandle {
    restarting: Arc<AtomicBool>,
    restart: Arc<Notify>,
    shutdown: CancellationToken,
}

impl WatchHandle {
    /// Request a restart. Returns `false` when one is already in progress.
    pub fn restart(&self) -> bool {
        if self
            .restarting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("restart already in progress");
            return false;
        }
        self.restart.notify_one();
        true
    }

    pub fn is_restarting(&self) -> bool {
        self.restarting.load(Ordering::Acquire)
    }

    /// Stop watching. [`WatchCoordinator::run`] returns after disposing.
    pub fn quit(&self) {
        self.shutdown.cancel();
    }

    /// Resolves once [`quit`](Self::quit) was called.
    pub async fn stopped(&self) {
        self.shutdown.cancelled().await;
    }

    fn restarted(&self) {
        self.restarting.store(false, Ordering::Release);
    }
}

pub struct WatchCoordinator {
    resolver: Resolver,
    inline: InlineConfig,
    engine: Arc<dyn Engine>,
    exit_code: ExitCode,
    handle: WatchHandle,
}

impl WatchCoordinator {
    /// `resolver` and `inline` are what the first build was resolved
    /// with; restarts resolve them again.
    pub fn new(
        resolver: Resolver,
        inline: InlineConfig,
        engine: Arc<dyn Engine>,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            resolver,
            inline,
            engine,
            exit_code,
            handle: WatchHandle::default(),
        }
    }

    pub fn handle(&self) -> WatchHandle {
        self.handle.clone()
    }

    /// Watch until [`WatchHandle::quit`]. `config_files` are the files the
    /// session was resolved from.
    pub async fn run(self, mut session: Session, mut config_files: Vec<PathBuf>) -> Result<()> {
        loop {
            let mut tasks = match self.watch(&session, &config_files) {
                Ok(tasks) => tasks,
                Err(err) => {
                    session.dispose();
                    return Err(err);
                }
            };
            tracing::info!("Watching for changes...");

            tokio::select! {
                _ = self.handle.restart.notified() => {}
                _ = self.handle.shutdown.cancelled() => {
                    session.dispose();
                    tasks.shutdown().await;
                    return Ok(());
                }
            }

            tracing::info!("Restarting...");
            session.dispose();
            tasks.shutdown().await;
            let generation = self.resolver.loader().next_generation();
            tracing::debug!("config loader generation {generation}");

            let rebuilt = driver::build(
                &self.resolver,
                &self.inline,
                Arc::clone(&self.engine),
                self.exit_code.clone(),
            )
            .await;
            match rebuilt {
                Ok((next, files)) => {
                    session = next;
                    config_files = files;
                }
                Err(err) => {
                    tracing::error!("{err}");
                    session = Session {
                        ctx: Arc::clone(&session.ctx),
                        pipelines: Vec::new(),
                    };
                }
            }
            self.handle.restarted();
        }
    }

    /// Spawn one task per package group plus one for the config files.
    fn watch(&self, session: &Session, config_files: &[PathBuf]) -> Result<JoinSet<()>> {
        let registry = &session.ctx.registry;
        let mut tasks = JoinSet::new();

        for PipelineGroup {
            manifest,
            pipelines,
        } in group_pipelines(session)
        {
            let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
            let watchers = pipelines
                .iter()
                .map(|pipeline| pipeline.config())
                .filter(|config| config.watch.is_enabled())
                .map(|config| {
                    FileWatcher::new(
                        watch_paths(config),
                        IgnoreRules::for_config(config),
                        tx.clone(),
                    )
                })
                .collect::<Result<Vec<_>>>()?;

            let group = GroupWatch {
                manifest,
                pipelines,
                registry: Arc::clone(registry),
                config_files: config_files.to_vec(),
                handle: self.handle.clone(),
                _watchers: watchers,
            };
            tasks.spawn(group.run(rx));
        }

        if !config_files.is_empty() {
            let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
            let watcher = FileWatcher::new(config_files.to_vec(), IgnoreRules::default(), tx)?;
            let handle = self.handle.clone();
            tasks.spawn(async move {
                let _watcher = watcher;
                while let Some(path) = rx.recv().await {
                    tracing::info!("Config file {} changed", path.display());
                    handle.restart();
                }
            });
        }

        Ok(tasks)
    }
}

/// Pipelines rebuilt together when a watched path changes.
pub struct PipelineGroup {
    /// Set when the registry tracks the package.
    pub manifest: Option<PathBuf>,
    pub pipelines: Vec<Arc<Pipeline>>,
}

#[derive(PartialEq, Eq, Hash)]
enum GroupKey {
    Package(PathBuf),
    OutDir(PathBuf),
}

/// Group pipelines by package, or by output directory when the registry
/// does not track them. A group holds every sibling, watching or not, since
/// the rendezvous waits for all of them; groups without a watching
/// pipeline are dropped.
pub fn group_pipelines(session: &Session) -> Vec<PipelineGroup> {
    let registry = &session.ctx.registry;
    let mut groups: Vec<PipelineGroup> = Vec::new();
    let mut index: FxHashMap<GroupKey, usize> = FxHashMap::default();

    for pipeline in &session.pipelines {
        let config = pipeline.config();
        let manifest = config
            .manifest_path()
            .filter(|_| registry.is_tracked(config))
            .map(Path::to_path_buf);
        let key = match &manifest {
            Some(manifest) => GroupKey::Package(manifest.clone()),
            None => GroupKey::OutDir(config.out_dir.clone()),
        };
        match index.get(&key) {
            Some(&i) => groups[i].pipelines.push(Arc::clone(pipeline)),
            None => {
                index.insert(key, groups.len());
                groups.push(PipelineGroup {
                    manifest,
                    pipelines: vec![Arc::clone(pipeline)],
                });
            }
        }
    }

    groups.retain(|group| {
        group
            .pipelines
            .iter()
            .any(|pipeline| pipeline.config().watch.is_enabled())
    });
    groups
}

struct GroupWatch {
    manifest: Option<PathBuf>,
    pipelines: Vec<Arc<Pipeline>>,
    registry: Arc<PackageRegistry>,
    config_files: Vec<PathBuf>,
    handle: WatchHandle,
    _watchers: Vec<FileWatcher>,
}

impl GroupWatch {
    async fn run(self, mut rx: mpsc::Receiver<PathBuf>) {
        while let Some(first) = rx.recv().await {
            let changed = debounce(first, &mut rx).await;
            if self.handle.is_restarting() {
                continue;
            }

            let structural = changed
                .iter()
                .find(|path| needs_restart(path, &self.config_files));
            if let Some(path) = structural {
                tracing::info!("Restarting due to change in {}", path.display());
                self.handle.restart();
                continue;
            }

            for path in &changed {
                tracing::info!("Change detected: {}", path.display());
            }
            rebuild(self.manifest.as_deref(), &self.pipelines, &self.registry).await;
        }
    }
}

/// Collect changes until none arrived for [`DEBOUNCE`].
async fn debounce(first: PathBuf, rx: &mut mpsc::Receiver<PathBuf>) -> BTreeSet<PathBuf> {
    let mut changed = BTreeSet::from([first]);
    loop {
        tokio::select! {
            Some(path) = rx.recv() => {
                changed.insert(path);
            }
            _ = tokio::time::sleep(DEBOUNCE) => return changed,
        }
    }
}

/// Rebuild every pipeline of one package group for a new epoch. Failures
/// are logged.
pub async fn rebuild(
    manifest: Option<&Path>,
    pipelines: &[Arc<Pipeline>],
    registry: &PackageRegistry,
) {
    let configs: Vec<&ResolvedConfig> = pipelines
        .iter()
        .map(|pipeline| &**pipeline.config())
        .collect();
    clean::clean(&configs).await;
    if let Some(manifest) = manifest {
        registry.reset(manifest);
    }

    let mut runs = JoinSet::new();
    for pipeline in pipelines {
        let pipeline = Arc::clone(pipeline);
        runs.spawn(async move { pipeline.run(true).await });
    }
    while let Some(result) = runs.join_next().await {
        match result {
            Ok(Ok(_)) => {}
            Ok(Err(err)) if matches!(err.root(), BuildError::Abandoned(_)) => {
                tracing::debug!("{err}")
            }
            Ok(Err(err)) => tracing::error!("{err}"),
            Err(err) => tracing::error!("rebuild task failed: {err}"),
        }
    }
}
