//! Build command implementation.
//!
//! Resolves the configs of the invocation, builds them once and, when any
//! config watches, hands the session over to the watch coordinator.

use std::sync::Arc;
use std::time::Instant;

use knit_bundler::{ExitCode, WatchCoordinator, build_configs, default_engine};
use knit_config::{Loader, Resolution, ResolvedConfig, Resolver};

use crate::cli::BuildArgs;
use crate::config::{Settings, inline_config};
use crate::error::Result;
use crate::{logger, shortcuts, ui};

/// Execute the build command. Returns the process exit code, which a
/// failing `onSuccess` command may have set.
///
/// # Build Process
///
/// 1. Layer `KNIT_*` settings under the flags
/// 2. Resolve config files and workspace packages into build configs
/// 3. Build every config once
/// 4. Keep watching if any config enables watch mode
pub async fn execute(args: BuildArgs) -> Result<i32> {
    let start_time = Instant::now();

    let settings = Settings::load(&args)?;
    let inline = inline_config(&args, &settings);

    let resolver = Resolver::new(Arc::new(Loader::new()))?;
    let Resolution { configs, files } = resolver.resolve(&inline).await?;
    if let Some(level) = effective_log_level(&settings, &configs) {
        logger::apply_log_level(level);
    }

    let engine = default_engine();
    let exit_code = ExitCode::default();
    let session = build_configs(configs, Arc::clone(&engine), exit_code.clone()).await?;

    if !session.is_watching() {
        if tracing::enabled!(tracing::Level::INFO) {
            ui::success(&format!(
                "Build complete in {}",
                ui::format_duration(start_time.elapsed())
            ));
        }
        return Ok(exit_code.get());
    }

    let coordinator = WatchCoordinator::new(resolver, inline, engine, exit_code.clone());
    let handle = coordinator.handle();
    let shortcuts = shortcuts::spawn(handle.clone());

    let ctrl_c = tokio::spawn({
        let handle = handle.clone();
        async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::warn!("Failed to listen for Ctrl+C: {e}");
                        return;
                    }
                    handle.quit();
                }
                _ = handle.stopped() => {}
            }
        }
    });

    let result = coordinator.run(session, files).await;

    handle.quit();
    ctrl_c.abort();
    if let Some(shortcuts) = shortcuts {
        shortcuts.abort();
    }

    result?;
    if tracing::enabled!(tracing::Level::INFO) {
        ui::info("Stopped watching");
    }
    Ok(exit_code.get())
}

/// `--log-level` (or `KNIT_LOG_LEVEL`) wins; otherwise the most verbose
/// level among the resolved configs applies to the shared log.
fn effective_log_level(
    settings: &Settings,
    configs: &[ResolvedConfig],
) -> Option<knit_config::LogLevel> {
    settings
        .log_level
        .or_else(|| configs.iter().map(|config| config.log_level).max())
}

#[cfg(test)]
mod tests {
    use super::*;
    use knit_config::LogLevel;

    #[test]
    fn test_log_level_from_settings_wins() {
        let settings = Settings {
            log_level: Some(LogLevel::Warn),
            ..Default::default()
        };
        assert_eq!(effective_log_level(&settings, &[]), Some(LogLevel::Warn));
    }

    #[test]
    fn test_no_configs_no_level() {
        assert_eq!(effective_log_level(&Settings::default(), &[]), None);
    }
}
