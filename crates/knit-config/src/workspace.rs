//! Workspace expansion.
//!
//! A root config with a `workspace` descriptor stands for every member
//! package below it. Each member contributes its own config file, layered
//! over the root config with the member directory as working directory.
//! Members are named after their package unless a config names them.

use std::path::{Path, PathBuf};

use futures::future::try_join_all;

use crate::error::{ConfigError, Result};
use crate::filter::{filter_packages, path_string};
use crate::glob::{self, Kind, Matcher};
use crate::loader::Loader;
use crate::package::{MANIFEST_FILE, PackageJson};
use crate::types::{ConfigFileOption, InlineConfig, OneOrMany, UserConfig};

/// Member directories skipped when the descriptor does not set `exclude`.
pub const DEFAULT_EXCLUDE: &[&str] = &[
    "**/node_modules/**",
    "**/dist/**",
    "**/test/**",
    "**/tests/**",
    "**/temp/**",
    "**/tmp/**",
];

const AUTO: &str = "auto";

#[derive(Debug, Clone, Default)]
pub struct Expanded {
    pub configs: Vec<UserConfig>,
    /// Member config files that were loaded.
    pub files: Vec<PathBuf>,
}

/// Expand `root` into one config per member package, or return it unchanged
/// (merged with the inline options) when workspace mode is off.
pub async fn expand_workspace(
    loader: &Loader,
    root: UserConfig,
    inline: &InlineConfig,
    invocation_cwd: &Path,
) -> Result<Expanded> {
    let normalized = root.merge(inline.user.clone());
    let Some(workspace) = normalized.workspace.as_ref().and_then(|w| w.normalize()) else {
        return Ok(Expanded {
            configs: vec![normalized],
            files: Vec::new(),
        });
    };

    let root_cwd = match &normalized.cwd {
        Some(cwd) => path_clean::clean(invocation_cwd.join(cwd)),
        None => invocation_cwd.to_path_buf(),
    };

    let exclude = workspace
        .exclude
        .as_ref()
        .map(OneOrMany::to_vec)
        .unwrap_or_else(|| DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect());
    let include = workspace.include.as_ref().map(OneOrMany::to_vec);

    let mut packages = discover_packages(&root_cwd, include.as_deref(), &exclude)?;
    if packages.is_empty() {
        return Err(ConfigError::NoWorkspacePackages);
    }

    if let Some(filter) = &inline.filter {
        packages = filter_packages(packages, filter)?;
        if packages.is_empty() {
            return Err(ConfigError::NoPackagesMatched);
        }
    }

    let mut base = normalized;
    base.workspace = None;

    let loads = packages.iter().map(|dir| {
        let member_inline = InlineConfig {
            user: inline.user.clone(),
            config: member_config_option(workspace.config.as_ref(), dir),
            config_loader: inline.config_loader,
            filter: inline.filter.clone(),
        };
        let root_cwd = root_cwd.as_path();
        async move {
            tracing::debug!("loading workspace config {}", dir.display());
            let loaded = loader.load(&member_inline, dir, Some(root_cwd)).await?;
            Ok::<_, ConfigError>((dir, loaded))
        }
    });

    let mut expanded = Expanded::default();
    for (dir, loaded) in try_join_all(loads).await? {
        match &loaded.file {
            Some(file) => {
                tracing::debug!("loaded workspace config file {}", file.display());
                expanded.files.push(file.clone());
            }
            None => tracing::debug!("no workspace config file found in {}", dir.display()),
        }
        let package_name = package_name(dir)?;
        for member in loaded.configs {
            let with_cwd = UserConfig {
                cwd: Some(dir.clone()),
                ..Default::default()
            };
            let mut config = base.clone().merge(with_cwd).merge(member);
            if config.name.is_none() {
                config.name = package_name.clone();
            }
            expanded.configs.push(config);
        }
    }
    Ok(expanded)
}

/// Member directories under `root`. With no include list (or `"auto"`),
/// every directory holding a `package.json` is a member, except the root.
pub fn discover_packages(
    root: &Path,
    include: Option<&[String]>,
    exclude: &[String],
) -> Result<Vec<PathBuf>> {
    let negated: Vec<String> = exclude.iter().map(|pattern| format!("!{pattern}")).collect();
    let excluded = Matcher::new(&negated)?;
    let is_excluded = |dir: &Path| {
        let relative = path_string(dir.strip_prefix(root).unwrap_or(dir));
        excluded.is_excluded(&relative)
            || excluded.is_excluded(&format!("{relative}/{MANIFEST_FILE}"))
    };

    let auto = match include {
        None => true,
        Some([only]) => only == AUTO,
        Some(_) => false,
    };

    let dirs: Vec<PathBuf> = if auto {
        glob::expand(root, &[format!("**/{MANIFEST_FILE}")], Kind::Files)?
            .into_iter()
            .filter_map(|manifest| manifest.parent().map(Path::to_path_buf))
            .filter(|dir| dir != root)
            .collect()
    } else {
        glob::expand(root, include.unwrap_or_default(), Kind::Dirs)?
    };

    Ok(dirs.into_iter().filter(|dir| !is_excluded(dir)).collect())
}

fn package_name(dir: &Path) -> Result<Option<String>> {
    let manifest = dir.join(MANIFEST_FILE);
    if !manifest.is_file() {
        return Ok(None);
    }
    Ok(PackageJson::read(&manifest)?.name().map(str::to_string))
}

fn member_config_option(
    option: Option<&ConfigFileOption>,
    member: &Path,
) -> Option<ConfigFileOption> {
    match option {
        Some(ConfigFileOption::Path(path)) => Some(ConfigFileOption::Path(member.join(path))),
        other => other.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn manifest(root: &Path, dir: &str, name: &str) {
        let dir = root.join(dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("package.json"), format!(r#"{{ "name": "{name}" }}"#)).unwrap();
    }

    #[test]
    fn auto_discovery_skips_default_excludes_and_root() {
        let root = TempDir::new().unwrap();
        manifest(root.path(), "", "root");
        manifest(root.path(), "packages/a", "a");
        manifest(root.path(), "packages/b", "b");
        manifest(root.path(), "node_modules/dep", "dep");
        manifest(root.path(), "packages/a/dist", "built");
        manifest(root.path(), "test/fixture", "fixture");
        manifest(root.path(), "tests/fixture", "fixture");
        manifest(root.path(), "temp/x", "x");
        manifest(root.path(), "tmp/y", "y");

        let exclude: Vec<String> = DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect();
        let dirs = discover_packages(root.path(), None, &exclude).unwrap();
        assert_eq!(
            dirs,
            vec![root.path().join("packages/a"), root.path().join("packages/b")]
        );
    }

    #[test]
    fn explicit_include_matches_directories() {
        let root = TempDir::new().unwrap();
        manifest(root.path(), "packages/a", "a");
        manifest(root.path(), "packages/b", "b");
        fs::write(root.path().join("packages/notes.md"), "").unwrap();

        let include = vec!["packages/*".to_string()];
        let exclude = vec!["**/b/**".to_string()];
        let dirs = discover_packages(root.path(), Some(&include), &exclude).unwrap();
        assert_eq!(dirs, vec![root.path().join("packages/a")]);
    }

    #[tokio::test]
    async fn no_descriptor_returns_root() {
        let root = TempDir::new().unwrap();
        let expanded = expand_workspace(
            &Loader::new(),
            UserConfig {
                name: Some("lib".into()),
                ..Default::default()
            },
            &InlineConfig::default(),
            root.path(),
        )
        .await
        .unwrap();
        assert_eq!(expanded.configs.len(), 1);
        assert_eq!(expanded.configs[0].name.as_deref(), Some("lib"));
    }

    #[tokio::test]
    async fn empty_workspace_is_an_error() {
        let root = TempDir::new().unwrap();
        let config: UserConfig = serde_json::from_value(serde_json::json!({ "workspace": true })).unwrap();
        let err = expand_workspace(&Loader::new(), config, &InlineConfig::default(), root.path())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No workspace packages found, please check your config");
    }

    #[tokio::test]
    async fn unmatched_filter_is_an_error() {
        let root = TempDir::new().unwrap();
        manifest(root.path(), "packages/a", "a");
        let config: UserConfig = serde_json::from_value(serde_json::json!({ "workspace": true })).unwrap();
        let inline = InlineConfig {
            filter: Some(OneOrMany::One("nope".into())),
            ..Default::default()
        };
        let err = expand_workspace(&Loader::new(), config, &inline, root.path())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No packages matched the filters");
    }

    #[tokio::test]
    async fn member_config_overrides_root() {
        let root = TempDir::new().unwrap();
        manifest(root.path(), "packages/a", "a");
        manifest(root.path(), "packages/b", "b");
        fs::write(
            root.path().join("packages/b/knit.config.json"),
            r#"{ "outDir": "lib" }"#,
        )
        .unwrap();

        let config: UserConfig = serde_json::from_value(serde_json::json!({
            "workspace": ["packages/*"],
            "outDir": "out",
            "minify": true
        }))
        .unwrap();
        let expanded = expand_workspace(&Loader::new(), config, &InlineConfig::default(), root.path())
            .await
            .unwrap();

        assert_eq!(expanded.configs.len(), 2);
        assert_eq!(expanded.files, vec![root.path().join("packages/b/knit.config.json")]);
        let a = &expanded.configs[0];
        let b = &expanded.configs[1];
        assert_eq!(a.cwd.as_deref(), Some(root.path().join("packages/a").as_path()));
        assert_eq!(a.out_dir.as_deref(), Some("out"));
        assert_eq!(b.out_dir.as_deref(), Some("lib"));
        assert_eq!(b.minify, Some(true));
        assert!(a.workspace.is_none());
        assert_eq!(a.name.as_deref(), Some("a"));
    }
}
