//! Shared utilities for command implementations.

use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

/// Resolve `--cwd` against the process working directory.
pub fn resolve_cwd(explicit: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().map_err(|e| {
        CliError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to get current directory: {e}"),
        ))
    })?;
    Ok(match explicit {
        Some(path) => path_clean::clean(cwd.join(path)),
        None => cwd,
    })
}

/// Package manager of a project, detected from its lock file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl PackageManager {
    /// Detection order: pnpm, yarn, bun, then npm (also covers
    /// `package-lock.json`).
    pub fn detect(project_dir: &Path) -> Self {
        if project_dir.join("pnpm-lock.yaml").exists() {
            PackageManager::Pnpm
        } else if project_dir.join("yarn.lock").exists() {
            PackageManager::Yarn
        } else if project_dir.join("bun.lockb").exists() || project_dir.join("bun.lock").exists()
        {
            PackageManager::Bun
        } else {
            PackageManager::Npm
        }
    }

    pub fn command(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Bun => "bun",
        }
    }

    pub fn install_cmd(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm install",
            PackageManager::Yarn => "yarn install",
            PackageManager::Pnpm => "pnpm install",
            PackageManager::Bun => "bun install",
        }
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.command())
    }
}
