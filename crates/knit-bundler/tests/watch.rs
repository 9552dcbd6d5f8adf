//! Watch-mode group rebuilds against a recording engine.

use std::sync::Arc;
use std::time::Duration;

use knit_bundler::testing::{RecordingEngine, resolve, write};
use knit_bundler::watch::{self, group_pipelines};
use knit_bundler::{BuildContext, PackageRegistry, build_all};
use knit_config::{Format, ResolvedConfig, UserConfig, WatchOption};
use tempfile::TempDir;

fn context(engine: Arc<RecordingEngine>, configs: &[ResolvedConfig]) -> Arc<BuildContext> {
    let registry = Arc::new(PackageRegistry::new(configs));
    Arc::new(BuildContext::new(engine, registry))
}

fn formats(formats: Vec<Format>, watch: bool) -> UserConfig {
    UserConfig {
        format: Some(formats.into()),
        watch: watch.then_some(WatchOption::Enabled(true)),
        ..Default::default()
    }
}

#[tokio::test]
async fn watching_config_rebuilds_with_its_non_watching_sibling() {
    let root = TempDir::new().unwrap();
    write(root.path(), "package.json", r#"{ "name": "pkg" }"#);
    write(root.path(), "src/index.ts", "export const a = 1;\n");
    let mut configs = resolve(root.path(), formats(vec![Format::Es], true));
    configs.extend(resolve(root.path(), formats(vec![Format::Cjs], false)));

    let engine = Arc::new(RecordingEngine::new());
    let ctx = context(engine.clone(), &configs);
    let session = build_all(configs, ctx).await.unwrap();

    let groups = group_pipelines(&session);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].pipelines.len(), 2);
    let manifest = root.path().join("package.json");
    assert_eq!(groups[0].manifest.as_deref(), Some(manifest.as_path()));
    assert_eq!(session.ctx.registry.expected(&manifest), Some(2));

    let built = engine.plans().len();
    tokio::time::timeout(
        Duration::from_secs(5),
        watch::rebuild(
            groups[0].manifest.as_deref(),
            &groups[0].pipelines,
            &session.ctx.registry,
        ),
    )
    .await
    .expect("rebuild waited on a sibling that never ran");

    assert_eq!(engine.plans().len(), built + 2);
    assert!(root.path().join("dist/index.mjs").exists());
    assert!(root.path().join("dist/index.cjs").exists());
}

#[tokio::test]
async fn untracked_formats_rebuild_as_one_group() {
    let root = TempDir::new().unwrap();
    write(root.path(), "src/index.ts", "export {}\n");
    let configs = resolve(root.path(), formats(vec![Format::Es, Format::Cjs], true));
    let ctx = context(Arc::new(RecordingEngine::new()), &configs);
    let session = build_all(configs, ctx).await.unwrap();

    let groups = group_pipelines(&session);
    assert_eq!(groups.len(), 1);
    assert!(groups[0].manifest.is_none());
    assert_eq!(groups[0].pipelines.len(), 2);

    write(root.path(), "dist/stale.js", "old");
    for _ in 0..10 {
        watch::rebuild(None, &groups[0].pipelines, &session.ctx.registry).await;
        assert!(root.path().join("dist/index.mjs").exists());
        assert!(root.path().join("dist/index.cjs").exists());
    }
    assert!(!root.path().join("dist/stale.js").exists());
}

#[tokio::test]
async fn sessions_without_watching_configs_have_no_groups() {
    let root = TempDir::new().unwrap();
    write(root.path(), "package.json", r#"{ "name": "pkg" }"#);
    write(root.path(), "src/index.ts", "export {}\n");
    let configs = resolve(root.path(), formats(vec![Format::Es, Format::Cjs], false));
    let ctx = context(Arc::new(RecordingEngine::new()), &configs);
    let session = build_all(configs, ctx).await.unwrap();

    assert!(group_pipelines(&session).is_empty());
}
