//! Removing stale output before a build.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use knit_config::ResolvedConfig;
use knit_config::glob::{Kind, expand};

use crate::error::Result;

/// Paths the `clean` option of `config` selects. The output directory itself
/// is never part of it. Patterns that cannot be read are logged and skipped.
pub fn collect(config: &ResolvedConfig) -> BTreeSet<PathBuf> {
    let mut removes = BTreeSet::new();
    let out_dir = normalize(&config.out_dir);

    for pattern in &config.clean {
        if let Err(err) = collect_pattern(config, pattern, &mut removes) {
            tracing::warn!("Failed to clean {pattern}: {err}");
        }
    }

    removes.retain(|path| normalize(path) != out_dir);
    removes
}

fn collect_pattern(
    config: &ResolvedConfig,
    pattern: &str,
    removes: &mut BTreeSet<PathBuf>,
) -> Result<()> {
    let path = Path::new(pattern);
    if path.is_absolute() {
        if path.is_dir() {
            for entry in std::fs::read_dir(path)? {
                removes.insert(entry?.path());
            }
        } else if path.exists() {
            removes.insert(path.to_path_buf());
        }
        return Ok(());
    }

    let patterns = [pattern];
    removes.extend(expand(&config.cwd, &patterns, Kind::Files)?);
    removes.extend(expand(&config.cwd, &patterns, Kind::Dirs)?);
    Ok(())
}

fn normalize(path: &Path) -> PathBuf {
    path_clean::clean(path)
}

/// Clean every config. Returns the number of selected paths; failures are
/// logged only.
pub async fn clean(configs: &[&ResolvedConfig]) -> usize {
    let mut removes = BTreeSet::new();
    for config in configs {
        removes.extend(collect(config));
    }
    if removes.is_empty() {
        return 0;
    }

    tracing::info!("Cleaning {} files", removes.len());
    join_all(removes.iter().map(|path| remove(path))).await;
    tracing::debug!("Removed {} files", removes.len());
    removes.len()
}

async fn remove(path: &Path) {
    tracing::debug!("Removing {}", path.display());
    let result = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(err) => Err(err),
    };
    match result {
        // Already gone with a removed parent directory.
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => tracing::warn!("Failed to remove {}: {err}", path.display()),
        Ok(()) => {}
    }
}
