//! Migrate command implementation.
//!
//! Moves a tsup project over to knit: `tsup.config.*` files are renamed to
//! `knit.config.*` and package.json drops its tsup references.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use knit_bundler::exports::{detect_indentation, to_string_with_indent};
use regex::Regex;
use serde_json::{Map, Value};

use crate::cli::MigrateArgs;
use crate::commands::utils::{self, PackageManager};
use crate::error::{CliError, Result, ResultExt};
use crate::ui;

const TSUP_CONFIG_FILES: [&str; 7] = [
    "tsup.config.ts",
    "tsup.config.cts",
    "tsup.config.mts",
    "tsup.config.js",
    "tsup.config.cjs",
    "tsup.config.mjs",
    "tsup.config.json",
];

static TSUP_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\btsup\b").expect("tsup pattern is valid"));
static TSUP_UPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bTSUP\b").expect("TSUP pattern is valid"));
static TSUP_COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\btsup(?:-node)?\b").expect("command pattern is valid"));

/// How a dependency field references knit after the migration.
#[derive(Debug, Clone, Copy)]
enum DepVersion {
    /// `^<version of this build>`
    Caret,
    Any,
    /// Keep the tsup value (`peerDependenciesMeta`).
    Keep,
}

const DEP_FIELDS: [(&str, DepVersion); 4] = [
    ("dependencies", DepVersion::Caret),
    ("devDependencies", DepVersion::Caret),
    ("peerDependencies", DepVersion::Any),
    ("peerDependenciesMeta", DepVersion::Keep),
];

/// A tsup config file and its knit replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRename {
    pub from: PathBuf,
    pub to: PathBuf,
    pub original: String,
    pub migrated: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRewrite {
    pub path: PathBuf,
    pub contents: String,
    /// One line per rewritten reference.
    pub changes: Vec<String>,
}

/// Every change the migration would make.
#[derive(Debug, Default)]
pub struct Migration {
    pub root: PathBuf,
    pub configs: Vec<ConfigRename>,
    pub manifest: Option<ManifestRewrite>,
}

impl Migration {
    /// Collect the changes for the project at `root` without touching it.
    pub fn plan(root: &Path) -> Result<Self> {
        let mut configs = Vec::new();
        for file in TSUP_CONFIG_FILES {
            let from = root.join(file);
            if !from.is_file() {
                continue;
            }
            let original = std::fs::read_to_string(&from).with_path(&from)?;
            let migrated = TSUP_WORD.replace_all(&original, "knit");
            let migrated = TSUP_UPPER.replace_all(&migrated, "KNIT").into_owned();
            configs.push(ConfigRename {
                to: root.join(file.replace("tsup", "knit")),
                from,
                original,
                migrated,
            });
        }

        let path = root.join("package.json");
        let manifest = if path.is_file() {
            let contents = std::fs::read_to_string(&path).with_path(&path)?;
            rewrite_manifest(&contents)?.map(|(contents, changes)| ManifestRewrite {
                path,
                contents,
                changes,
            })
        } else {
            None
        };

        Ok(Self {
            root: root.to_path_buf(),
            configs,
            manifest,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty() && self.manifest.is_none()
    }

    pub fn apply(&self) -> Result<()> {
        for config in &self.configs {
            std::fs::write(&config.to, &config.migrated).with_path(&config.to)?;
            std::fs::remove_file(&config.from).with_path(&config.from)?;
            ui::success(&format!(
                "Migrated {}",
                ui::format_rename(&self.root, &config.from, &config.to)
            ));
        }
        if let Some(manifest) = &self.manifest {
            std::fs::write(&manifest.path, &manifest.contents).with_path(&manifest.path)?;
            ui::success("Migrated package.json");
        }
        Ok(())
    }

    fn print_plan(&self) {
        for config in &self.configs {
            ui::info(&format!(
                "[dry-run] {}",
                ui::format_rename(&self.root, &config.from, &config.to)
            ));
            for (before, after) in config.original.lines().zip(config.migrated.lines()) {
                if before != after {
                    eprintln!("  - {before}");
                    eprintln!("  + {after}");
                }
            }
        }
        if let Some(manifest) = &self.manifest {
            ui::info("[dry-run] package.json:");
            for change in &manifest.changes {
                ui::hint(change);
            }
        }
    }
}

/// Execute the migrate command. Returns the process exit code.
pub fn execute(args: MigrateArgs) -> Result<i32> {
    let root = utils::resolve_cwd(args.cwd.as_deref())?;

    if args.dry_run {
        ui::info("Dry run enabled. No changes will be made.");
    } else if !args.yes && !confirm()? {
        ui::warning("Migration cancelled.");
        return Ok(1);
    }

    let migration = Migration::plan(&root)?;
    if migration.configs.is_empty() {
        ui::warning("No tsup config found");
    }
    if migration.is_empty() {
        return Err(CliError::Migrate("No migration performed".to_string()));
    }

    let install = PackageManager::detect(&root).install_cmd();
    if args.dry_run {
        migration.print_plan();
        ui::info(&format!("[dry-run] would run: {install}"));
    } else {
        migration.apply()?;
        ui::info(&format!(
            "Migration completed. Run `{install}` to install knit."
        ));
    }
    Ok(0)
}

fn confirm() -> Result<bool> {
    if !ui::is_interactive() {
        return Err(CliError::InvalidArgument(
            "Refusing to migrate without confirmation. Pass --yes or --dry-run".to_string(),
        ));
    }

    let term = console::Term::stderr();
    term.write_line(
        "This will rewrite your config files and package.json. Uncommitted changes may be lost.\n\
         Use --dry-run to preview the changes first.",
    )?;
    write!(&term, "Continue? [y/N] ")?;
    let answer = term.read_line()?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
}

/// Rewrite the tsup references of a package.json. `None` when there are none.
fn rewrite_manifest(contents: &str) -> Result<Option<(String, Vec<String>)>> {
    let mut manifest: Map<String, Value> = serde_json::from_str(contents)?;
    let mut changes = Vec::new();

    if let Some(Value::Object(scripts)) = manifest.get_mut("scripts") {
        for (name, script) in scripts.iter_mut() {
            let Value::String(command) = script else {
                continue;
            };
            let migrated = TSUP_COMMAND.replace_all(command, "knit");
            if migrated != command.as_str() {
                changes.push(format!("scripts.{name}: {command} → {migrated}"));
                *command = migrated.into_owned();
            }
        }
    }

    if manifest.contains_key("tsup") {
        manifest = rename_key(manifest, "tsup", "knit", None);
        changes.push("tsup → knit".to_string());
    }

    for (field, version) in DEP_FIELDS {
        let Some(Value::Object(deps)) = manifest.get_mut(field) else {
            continue;
        };
        if !deps.contains_key("tsup") {
            continue;
        }
        let value = match version {
            DepVersion::Caret => Some(Value::String(format!(
                "^{}",
                env!("CARGO_PKG_VERSION")
            ))),
            DepVersion::Any => Some(Value::String("*".to_string())),
            DepVersion::Keep => None,
        };
        *deps = rename_key(std::mem::take(deps), "tsup", "knit", value);
        changes.push(format!("{field}.tsup → {field}.knit"));
    }

    if changes.is_empty() {
        return Ok(None);
    }

    let mut rewritten = to_string_with_indent(&manifest, &detect_indentation(contents))?;
    if contents.ends_with('\n') {
        rewritten.push('\n');
    }
    Ok(Some((rewritten, changes)))
}

/// Rename `from` to `to` in place, optionally replacing its value.
fn rename_key(
    map: Map<String, Value>,
    from: &str,
    to: &str,
    value: Option<Value>,
) -> Map<String, Value> {
    let mut value = value;
    map.into_iter()
        .map(|(key, old)| {
            if key == from {
                (to.to_string(), value.take().unwrap_or(old))
            } else {
                (key, old)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PACKAGE_JSON: &str = r#"{
    "name": "lib",
    "scripts": {
        "build": "tsup",
        "dev": "tsup --watch",
        "node": "tsup-node src/cli.ts",
        "test": "vitest"
    },
    "tsup": {
        "entry": ["src/index.ts"]
    },
    "devDependencies": {
        "prettier": "^3.0.0",
        "tsup": "^8.0.0",
        "typescript": "^5.0.0"
    },
    "peerDependencies": {
        "tsup": "^8.0.0"
    },
    "peerDependenciesMeta": {
        "tsup": {
            "optional": true
        }
    }
}
"#;

    #[test]
    fn test_rewrite_manifest() {
        let (contents, changes) = rewrite_manifest(PACKAGE_JSON).unwrap().unwrap();
        let manifest: Value = serde_json::from_str(&contents).unwrap();

        assert_eq!(manifest["scripts"]["build"], "knit");
        assert_eq!(manifest["scripts"]["dev"], "knit --watch");
        assert_eq!(manifest["scripts"]["node"], "knit src/cli.ts");
        assert_eq!(manifest["scripts"]["test"], "vitest");
        assert!(manifest.get("tsup").is_none());
        assert_eq!(manifest["knit"]["entry"][0], "src/index.ts");
        assert_eq!(
            manifest["devDependencies"]["knit"],
            format!("^{}", env!("CARGO_PKG_VERSION"))
        );
        assert_eq!(manifest["peerDependencies"]["knit"], "*");
        assert_eq!(manifest["peerDependenciesMeta"]["knit"]["optional"], true);
        assert_eq!(changes.len(), 7);
    }

    #[test]
    fn test_rewrite_manifest_keeps_order_and_indentation() {
        let (contents, _) = rewrite_manifest(PACKAGE_JSON).unwrap().unwrap();

        let keys: Vec<String> = serde_json::from_str::<Map<String, Value>>(&contents)
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys[2], "knit");

        let dev: Vec<String> = serde_json::from_str::<Value>(&contents).unwrap()
            ["devDependencies"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(dev, vec!["prettier", "knit", "typescript"]);

        assert!(contents.contains("\n    \"name\""));
        assert!(contents.ends_with("}\n"));
    }

    #[test]
    fn test_rewrite_manifest_without_tsup() {
        let manifest = r#"{"name":"lib","scripts":{"build":"vite build"}}"#;
        assert!(rewrite_manifest(manifest).unwrap().is_none());
    }

    #[test]
    fn test_plan_and_apply() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::write(
            root.join("tsup.config.ts"),
            "import { defineConfig } from 'tsup'\n// TSUP_ENV\nexport default defineConfig({})\n",
        )
        .unwrap();
        std::fs::write(root.join("package.json"), PACKAGE_JSON).unwrap();

        let migration = Migration::plan(root).unwrap();
        assert_eq!(migration.configs.len(), 1);
        assert!(migration.manifest.is_some());
        assert!(root.join("tsup.config.ts").exists());

        migration.apply().unwrap();
        assert!(!root.join("tsup.config.ts").exists());
        let config = std::fs::read_to_string(root.join("knit.config.ts")).unwrap();
        assert_eq!(
            config,
            "import { defineConfig } from 'knit'\n// TSUP_ENV\nexport default defineConfig({})\n"
        );
        let manifest = std::fs::read_to_string(root.join("package.json")).unwrap();
        assert!(!manifest.contains("tsup"));
    }

    #[test]
    fn test_empty_plan() {
        let temp = TempDir::new().unwrap();
        assert!(Migration::plan(temp.path()).unwrap().is_empty());
    }
}
