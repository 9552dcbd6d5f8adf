//! End-to-end tests of the `knit` binary.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const TSUP_CONFIG: &str = "import { defineConfig } from 'tsup'\n\nexport default defineConfig({ entry: ['src/index.ts'] })\n";

const PACKAGE_JSON: &str = r#"{
  "name": "lib",
  "scripts": {
    "build": "tsup"
  },
  "devDependencies": {
    "tsup": "^8.0.0"
  }
}
"#;

fn knit() -> Command {
    let mut cmd = Command::cargo_bin("knit").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn tsup_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("tsup.config.ts"), TSUP_CONFIG).unwrap();
    fs::write(temp.path().join("package.json"), PACKAGE_JSON).unwrap();
    temp
}

#[test]
fn help_lists_commands() {
    knit()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("--format"));
}

#[test]
fn version_is_printed() {
    knit()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_format_is_rejected() {
    knit()
        .args(["--format", "amd"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("amd"));
}

#[test]
fn build_without_entry_fails() {
    let temp = TempDir::new().unwrap();
    knit()
        .current_dir(temp.path())
        .arg("--no-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No input files"));
}

#[test]
fn build_with_missing_entry_fails() {
    let temp = TempDir::new().unwrap();
    knit()
        .current_dir(temp.path())
        .args(["--no-config", "src/missing.ts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("src/missing.ts"));
}

#[test]
fn migrate_dry_run_changes_nothing() {
    let temp = tsup_project();
    knit()
        .current_dir(temp.path())
        .args(["migrate", "--dry-run"])
        .assert()
        .success()
        .stderr(predicate::str::contains("knit.config.ts"))
        .stderr(predicate::str::contains("would run: npm install"));

    assert!(temp.path().join("tsup.config.ts").exists());
    assert!(!temp.path().join("knit.config.ts").exists());
    assert_eq!(
        fs::read_to_string(temp.path().join("package.json")).unwrap(),
        PACKAGE_JSON
    );
}

#[test]
fn migrate_rewrites_project() {
    let temp = tsup_project();
    fs::write(temp.path().join("pnpm-lock.yaml"), "").unwrap();

    knit()
        .args(["migrate", "--yes", "--cwd"])
        .arg(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("pnpm install"));

    assert!(!temp.path().join("tsup.config.ts").exists());
    let config = fs::read_to_string(temp.path().join("knit.config.ts")).unwrap();
    assert!(config.contains("from 'knit'"));

    let manifest = fs::read_to_string(temp.path().join("package.json")).unwrap();
    assert!(manifest.contains(r#""build": "knit""#));
    assert!(manifest.contains(r#""knit": "^"#));
    assert!(!manifest.contains("tsup"));
    assert!(manifest.ends_with("}\n"));
}

#[test]
fn migrate_without_tsup_fails() {
    let temp = TempDir::new().unwrap();
    knit()
        .current_dir(temp.path())
        .args(["migrate", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No migration performed"));
}

#[test]
fn migrate_requires_confirmation_without_terminal() {
    let temp = tsup_project();
    knit()
        .current_dir(temp.path())
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));

    assert!(temp.path().join("tsup.config.ts").exists());
}
