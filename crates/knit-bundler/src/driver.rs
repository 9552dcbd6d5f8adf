//! Build pipelines.
//!
//! One [`Pipeline`] per resolved config. A run plans the build, invokes the
//! engine (twice for CommonJS with declarations), writes the chunks, meets
//! its sibling formats at the [`PackageRegistry`], then copies side files
//! and starts the success hook.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use knit_config::{ConfigId, Format, InlineConfig, Resolution, ResolvedConfig, Resolver};
use tokio::sync::mpsc;

use crate::chunk::Bundle;
use crate::engine::Engine;
use crate::error::{BuildError, Result};
use crate::hook::{ExitCode, SuccessHook};
use crate::plan::BuildPlan;
use crate::registry::PackageRegistry;
use crate::{clean, copy, report, shebang, writer};

/// Lifecycle of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    BuildStart,
    BundleStart,
    BundleEnd { duration: Duration },
    BuildEnd { duration: Duration },
    Error(String),
}

/// State shared by every pipeline of one invocation.
pub struct BuildContext {
    pub engine: Arc<dyn Engine>,
    pub registry: Arc<PackageRegistry>,
    pub exit_code: ExitCode,
    events: Option<mpsc::UnboundedSender<(ConfigId, PipelineEvent)>>,
}

impl BuildContext {
    pub fn new(engine: Arc<dyn Engine>, registry: Arc<PackageRegistry>) -> Self {
        Self {
            engine,
            registry,
            exit_code: ExitCode::default(),
            events: None,
        }
    }

    pub fn with_exit_code(mut self, exit_code: ExitCode) -> Self {
        self.exit_code = exit_code;
        self
    }

    /// Receive the lifecycle events of every pipeline.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<(ConfigId, PipelineEvent)> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    fn emit(&self, id: ConfigId, event: PipelineEvent) {
        tracing::trace!("{id} {event:?}");
        if let Some(events) = &self.events {
            let _ = events.send((id, event));
        }
    }
}

pub struct Pipeline {
    config: Arc<ResolvedConfig>,
    ctx: Arc<BuildContext>,
    hook: SuccessHook,
}

impl Pipeline {
    pub fn new(config: Arc<ResolvedConfig>, ctx: Arc<BuildContext>) -> Self {
        let hook = SuccessHook::new(ctx.exit_code.clone());
        Self { config, ctx, hook }
    }

    pub fn config(&self) -> &Arc<ResolvedConfig> {
        &self.config
    }

    /// Build once. `rebuild` only changes the completion message. Outside
    /// watch mode the success hook is awaited.
    pub async fn run(&self, rebuild: bool) -> Result<Arc<Bundle>> {
        let config = &self.config;
        let started = Instant::now();
        self.hook.cancel();
        self.ctx.emit(config.id, PipelineEvent::BuildStart);

        let bundle = match self.bundle().await {
            Ok(bundle) => bundle,
            Err(err) => {
                self.ctx.registry.on_bundle_failed(config);
                self.ctx.emit(config.id, PipelineEvent::Error(err.to_string()));
                return Err(err);
            }
        };

        if let Err(err) = self.ctx.registry.on_bundle_complete(Arc::clone(&bundle)).await {
            self.ctx.emit(config.id, PipelineEvent::Error(err.to_string()));
            return Err(err);
        }
        if !self.ctx.registry.is_tracked(config)
            && (config.copy.is_some() || config.on_success.is_some())
        {
            tracing::debug!(
                "{} has no package.json; copy and onSuccess run for this config alone",
                config.label()
            );
        }
        copy::copy(config).await?;

        let duration = started.elapsed();
        tracing::info!(
            "{} {} complete in {}ms",
            config.label(),
            if rebuild { "Rebuild" } else { "Build" },
            duration.as_millis()
        );
        self.ctx.emit(config.id, PipelineEvent::BuildEnd { duration });

        if let Some(handle) = self.hook.start(Arc::clone(config)) {
            if config.watch.is_enabled() {
                let label = config.label();
                tokio::spawn(async move {
                    match handle.await {
                        Ok(Err(err)) => tracing::error!("{label} {err}"),
                        Err(err) if err.is_panic() => {
                            tracing::error!("{label} onSuccess panicked")
                        }
                        _ => {}
                    }
                });
            } else {
                handle.await.map_err(|e| BuildError::Hook(e.to_string()))??;
            }
        }

        Ok(bundle)
    }

    /// Engine passes, written to disk.
    async fn bundle(&self) -> Result<Arc<Bundle>> {
        let config = &self.config;
        let started = Instant::now();
        self.ctx.emit(config.id, PipelineEvent::BundleStart);

        let plan = BuildPlan::new(config, false);
        let mut chunks = self.ctx.engine.build(&plan).await?;
        if config.format == Format::Cjs && config.dts.is_some() {
            let dts_plan = BuildPlan::new(config, true);
            chunks.extend(self.ctx.engine.build(&dts_plan).await?);
        }
        for chunk in &mut chunks {
            chunk.out_dir = config.out_dir.clone();
        }

        writer::write_chunks(&chunks)?;
        shebang::grant_execute(&chunks)?;
        report::report(config, &chunks);
        self.ctx.emit(
            config.id,
            PipelineEvent::BundleEnd {
                duration: started.elapsed(),
            },
        );

        Ok(Arc::new(Bundle::new(Arc::clone(config), chunks)))
    }

    /// Cancel the running success hook.
    pub fn dispose(&self) {
        self.hook.cancel();
    }
}

/// Build `config` once on its own.
pub async fn build_single(
    config: Arc<ResolvedConfig>,
    ctx: Arc<BuildContext>,
) -> Result<Arc<Bundle>> {
    Pipeline::new(config, ctx).run(false).await
}

/// Pipelines of one invocation, after their first build.
pub struct Session {
    pub ctx: Arc<BuildContext>,
    pub pipelines: Vec<Arc<Pipeline>>,
}

impl Session {
    /// Whether any pipeline keeps watching after the first build.
    pub fn is_watching(&self) -> bool {
        self.pipelines
            .iter()
            .any(|pipeline| pipeline.config.watch.is_enabled())
    }

    pub fn dispose(&self) {
        for pipeline in &self.pipelines {
            pipeline.dispose();
        }
    }
}

/// Resolve `inline` and build every config once. Also returns the config
/// files that contributed, which watch mode observes for restarts.
pub async fn build(
    resolver: &Resolver,
    inline: &InlineConfig,
    engine: Arc<dyn Engine>,
    exit_code: ExitCode,
) -> Result<(Session, Vec<PathBuf>)> {
    let Resolution { configs, files } = resolver.resolve(inline).await?;
    let session = build_configs(configs, engine, exit_code).await?;
    Ok((session, files))
}

/// Build already resolved configs with a fresh registry.
pub async fn build_configs(
    configs: Vec<ResolvedConfig>,
    engine: Arc<dyn Engine>,
    exit_code: ExitCode,
) -> Result<Session> {
    if configs.is_empty() {
        tracing::warn!("No configs to build");
    }
    let registry = Arc::new(PackageRegistry::new(&configs));
    let ctx = Arc::new(BuildContext::new(engine, registry).with_exit_code(exit_code));
    build_all(configs, ctx).await
}

/// Clean once, then build every config concurrently.
///
/// Without watch mode the first failure is returned. With watch mode
/// failures are logged and the session is returned so watching can pick
/// up from there.
pub async fn build_all(configs: Vec<ResolvedConfig>, ctx: Arc<BuildContext>) -> Result<Session> {
    for config in &configs {
        if config.watch.is_enabled() && config.out_dir == config.cwd {
            return Err(BuildError::WatchOutDirIsCwd(config.out_dir.clone()));
        }
    }

    let refs: Vec<&ResolvedConfig> = configs.iter().collect();
    clean::clean(&refs).await;

    tracing::info!("Build start");
    let pipelines: Vec<Arc<Pipeline>> = configs
        .into_iter()
        .map(|config| Arc::new(Pipeline::new(Arc::new(config), Arc::clone(&ctx))))
        .collect();

    let results = join_all(pipelines.iter().map(|pipeline| pipeline.run(false))).await;

    let mut errors = Vec::new();
    for (pipeline, result) in pipelines.iter().zip(results) {
        if let Err(err) = result {
            if pipeline.config.watch.is_enabled() {
                tracing::error!("{err}");
            } else {
                errors.push(err);
            }
        }
    }
    if let Some(err) = primary_error(errors) {
        return Err(err);
    }

    Ok(Session { ctx, pipelines })
}

/// The first error that is a cause rather than a consequence of another
/// pipeline failing.
fn primary_error(errors: Vec<BuildError>) -> Option<BuildError> {
    let position = errors
        .iter()
        .position(|err| !matches!(err.root(), BuildError::Abandoned(_)))
        .unwrap_or(0);
    errors.into_iter().nth(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn root_causes_win_over_abandoned_siblings() {
        let errors = vec![
            BuildError::Abandoned(PathBuf::from("/p/package.json")),
            BuildError::engine("es", "syntax error"),
        ];
        assert!(matches!(primary_error(errors), Some(BuildError::Engine { .. })));
        assert!(primary_error(Vec::new()).is_none());
    }
}
