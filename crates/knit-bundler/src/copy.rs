//! Copying side files into the output.

use std::path::{Path, PathBuf};

use knit_config::{CopyEntry, ResolvedConfig};
use walkdir::WalkDir;

use crate::error::Result;

/// Source and destination of every `copy` entry. Plain paths land in
/// `outDir` under their base name; pairs are relative to `cwd`.
pub fn resolve_copy(config: &ResolvedConfig) -> Vec<(PathBuf, PathBuf)> {
    let Some(entries) = &config.copy else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|entry| match entry {
            CopyEntry::Path(path) => {
                let from = path_clean::clean(config.cwd.join(path));
                let to = match from.file_name() {
                    Some(name) => config.out_dir.join(name),
                    None => config.out_dir.clone(),
                };
                (from, to)
            }
            CopyEntry::Pair { from, to } => (
                path_clean::clean(config.cwd.join(from)),
                path_clean::clean(config.cwd.join(to)),
            ),
        })
        .collect()
}

pub async fn copy(config: &ResolvedConfig) -> Result<()> {
    for (from, to) in resolve_copy(config) {
        tracing::info!(
            "{} Copying files from {} to {}",
            config.label(),
            relative(&config.cwd, &from).display(),
            relative(&config.cwd, &to).display()
        );
        tokio::task::spawn_blocking(move || copy_recursive(&from, &to))
            .await
            .map_err(std::io::Error::other)??;
    }
    Ok(())
}

fn relative<'a>(cwd: &Path, path: &'a Path) -> &'a Path {
    path.strip_prefix(cwd).unwrap_or(path)
}

/// Copy a file, or a directory tree, to `to`.
pub fn copy_recursive(from: &Path, to: &Path) -> Result<()> {
    if from.is_file() {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(from, to)?;
        return Ok(());
    }

    for entry in WalkDir::new(from).follow_links(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn copies_directory_trees() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("public");
        fs::create_dir_all(from.join("img")).unwrap();
        fs::write(from.join("robots.txt"), "ok").unwrap();
        fs::write(from.join("img/logo.svg"), "<svg/>").unwrap();

        let to = dir.path().join("dist/public");
        copy_recursive(&from, &to).unwrap();

        assert_eq!(fs::read_to_string(to.join("robots.txt")).unwrap(), "ok");
        assert_eq!(fs::read_to_string(to.join("img/logo.svg")).unwrap(), "<svg/>");
    }

    #[test]
    fn copies_single_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("LICENSE"), "MIT").unwrap();
        let to = dir.path().join("dist/LICENSE");
        copy_recursive(&dir.path().join("LICENSE"), &to).unwrap();
        assert_eq!(fs::read_to_string(to).unwrap(), "MIT");
    }
}
