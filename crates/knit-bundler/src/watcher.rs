//! File system watching for watch mode.
//!
//! Watches the configured paths recursively and forwards every relevant
//! changed path through a channel. Debouncing happens on the receiving side.

use std::path::{Component, Path, PathBuf};

use knit_config::{Pattern, ResolvedConfig, WatchTarget};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::Result;

/// Directory names that never trigger a rebuild.
const IGNORED_DIRS: &[&str] = &[".git", "node_modules"];

/// Paths a pipeline does not react to.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    dirs: Vec<PathBuf>,
    patterns: Vec<Pattern>,
}

impl IgnoreRules {
    /// `outDir` plus `ignoreWatch` of `config`.
    pub fn for_config(config: &ResolvedConfig) -> Self {
        Self {
            dirs: vec![config.out_dir.clone()],
            patterns: config.ignore_watch.clone(),
        }
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let in_ignored_dir = path.components().any(|component| match component {
            Component::Normal(name) => name
                .to_str()
                .is_some_and(|name| IGNORED_DIRS.contains(&name)),
            _ => false,
        });
        if in_ignored_dir || self.dirs.iter().any(|dir| path.starts_with(dir)) {
            return true;
        }

        let path_str = path.to_string_lossy();
        self.patterns.iter().any(|pattern| match pattern {
            Pattern::Exact(prefix) => path.starts_with(prefix),
            Pattern::Regex(regex) => regex.is_match(&path_str),
        })
    }
}

/// Paths watched for `config`. Empty when watching is off.
pub fn watch_paths(config: &ResolvedConfig) -> Vec<PathBuf> {
    match &config.watch {
        WatchTarget::Disabled => Vec::new(),
        WatchTarget::Cwd => vec![config.cwd.clone()],
        WatchTarget::Paths(paths) => paths.clone(),
    }
}

/// A running watcher. Watching stops when it is dropped.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    paths: Vec<PathBuf>,
}

impl FileWatcher {
    /// Watch `paths` recursively and send changed paths not matched by
    /// `ignore` to `tx`.
    ///
    /// A full channel drops the path: a rebuild is already pending then.
    pub fn new(
        paths: Vec<PathBuf>,
        ignore: IgnoreRules,
        tx: mpsc::Sender<PathBuf>,
    ) -> Result<Self> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!("File watcher error: {err}");
                    return;
                }
            };
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                return;
            }
            for path in event.paths {
                if ignore.is_ignored(&path) {
                    continue;
                }
                tracing::trace!("change detected: {}", path.display());
                let _ = tx.try_send(path);
            }
        })?;

        for path in &paths {
            let mode = if path.is_dir() {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            watcher.watch(path, mode)?;
            tracing::debug!("watching {}", path.display());
        }

        Ok(Self {
            _watcher: watcher,
            paths,
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}
