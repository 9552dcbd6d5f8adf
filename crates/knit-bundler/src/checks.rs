//! Package checks: `publint` and `@arethetypeswrong/cli`.
//!
//! Both run through `npx` inside the package directory. A missing tool is
//! logged and skipped; findings are reported as warnings or, at `error`
//! level or under `failOnWarn`, returned as [`BuildError::Check`].

use std::path::Path;
use std::process::Stdio;

use knit_config::{AttwOptions, AttwProfile, CheckLevel, PublintOptions};
use tokio::process::Command;

use crate::error::{BuildError, Result};

pub const PUBLINT: &str = "publint";
pub const ATTW: &str = "attw";

/// `fail_on_warn` runs publint in strict mode so warnings fail it too.
pub fn publint_args(options: &PublintOptions, fail_on_warn: bool) -> Vec<String> {
    let mut args = vec!["--yes".to_string(), "publint".to_string(), "run".to_string()];
    let level = match options.level.unwrap_or(CheckLevel::Suggestion) {
        CheckLevel::Suggestion => "suggestion",
        CheckLevel::Warning => "warning",
        CheckLevel::Error => "error",
    };
    args.extend(["--level".to_string(), level.to_string()]);
    if options.strict.unwrap_or(false) || fail_on_warn {
        args.push("--strict".to_string());
    }
    args
}

pub fn attw_args(options: &AttwOptions) -> Vec<String> {
    let profile = match options.profile.unwrap_or(AttwProfile::Strict) {
        AttwProfile::Strict => "strict",
        AttwProfile::Node16 => "node16",
        AttwProfile::EsmOnly => "esm-only",
    };
    ["--yes", "@arethetypeswrong/cli", "--pack", ".", "--profile", profile]
        .into_iter()
        .map(String::from)
        .collect()
}

/// What a finished check run means for the build.
fn interpret(
    tool: &'static str,
    package: &str,
    success: bool,
    output: &str,
    fail_build: bool,
) -> Result<()> {
    if success {
        tracing::info!("[{tool}] {package}: No issues found");
        return Ok(());
    }

    let message = output.trim().to_string();
    if fail_build {
        return Err(BuildError::Check {
            tool,
            package: package.to_string(),
            message,
        });
    }
    tracing::warn!("[{tool}] {package}: {message}");
    Ok(())
}

async fn run_npx(tool: &'static str, dir: &Path, args: &[String]) -> Option<(bool, String)> {
    tracing::debug!("[{tool}] npx {} in {}", args.join(" "), dir.display());
    let output = Command::new("npx")
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .output()
        .await;

    match output {
        Ok(output) => {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            Some((output.status.success(), text))
        }
        Err(err) => {
            tracing::error!("[{tool}] failed to run npx: {err}");
            None
        }
    }
}

pub async fn publint(
    package: &str,
    dir: &Path,
    options: &PublintOptions,
    fail_on_warn: bool,
) -> Result<()> {
    let args = publint_args(options, fail_on_warn);
    let Some((success, output)) = run_npx(PUBLINT, dir, &args).await else {
        return Ok(());
    };
    // publint exits non-zero only for problems at error severity (or any
    // problem under `strict`).
    interpret(PUBLINT, package, success, &output, true)
}

pub async fn attw(
    package: &str,
    dir: &Path,
    options: &AttwOptions,
    fail_on_warn: bool,
) -> Result<()> {
    let Some((success, output)) = run_npx(ATTW, dir, &attw_args(options)).await else {
        return Ok(());
    };
    let fail_build = fail_on_warn || options.level == Some(CheckLevel::Error);
    interpret(ATTW, package, success, &output, fail_build)
}
