//! Resolution of user configs into per-format build configs.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::try_join_all;

use crate::entry::{EntryMap, resolve_entry};
use crate::env::{DEFAULT_ENV_PREFIX, collect_env};
use crate::error::{ConfigError, Result};
use crate::feature::{is_in_ci, resolve_feature_option};
use crate::filter::{ConfigFilter, Pattern, path_string};
use crate::loader::Loader;
use crate::package::PackageJson;
use crate::target::resolve_target;
use crate::types::{
    AttwOptions, CiOption, CleanOption, ConfigFileOption, CopyEntry, DtsOptions,
    ExportsOptions, Format, InlineConfig, LogLevel, NodeProtocolOption, OnSuccess, OneOrMany,
    Platform, PublintOptions, ReportOptions, SourcemapKeyword, SourcemapOption, StripKeyword,
    Toggle, UserConfig, WatchOption,
};
use crate::workspace::expand_workspace;

static NEXT_CONFIG_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one resolved config, used to key per-build bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigId(u64);

impl ConfigId {
    fn next() -> Self {
        ConfigId(NEXT_CONFIG_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourcemapMode {
    #[default]
    Off,
    File,
    Inline,
    Hidden,
}

/// What happens to `node:` specifiers of builtin modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeProtocol {
    #[default]
    Preserve,
    Add,
    Strip,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WatchTarget {
    #[default]
    Disabled,
    Cwd,
    Paths(Vec<PathBuf>),
}

impl WatchTarget {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, WatchTarget::Disabled)
    }
}

/// A fully defaulted config for exactly one output format.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub id: ConfigId,
    pub name: Option<String>,
    pub cwd: PathBuf,
    pub entry: EntryMap,
    pub format: Format,
    pub platform: Platform,
    pub target: Option<Vec<String>>,
    pub out_dir: PathBuf,
    /// Absolute directories have their contents removed, anything else is a
    /// glob relative to `cwd`.
    pub clean: Vec<String>,
    pub sourcemap: SourcemapMode,
    pub minify: bool,
    pub treeshake: bool,
    pub external: Vec<Pattern>,
    pub no_external: Vec<Pattern>,
    pub inline_only: Option<Vec<Pattern>>,
    pub skip_node_modules_bundle: bool,
    pub alias: BTreeMap<String, String>,
    pub define: BTreeMap<String, String>,
    pub env: BTreeMap<String, String>,
    pub tsconfig: Option<PathBuf>,
    pub shims: bool,
    pub unbundle: bool,
    pub node_protocol: NodeProtocol,
    pub fixed_extension: bool,
    pub hash: bool,
    pub cjs_default: bool,
    pub glob_import: bool,
    pub global_name: Option<String>,
    pub log_level: LogLevel,
    pub fail_on_warn: bool,
    pub watch: WatchTarget,
    /// Absolute paths or regexes.
    pub ignore_watch: Vec<Pattern>,
    pub dts: Option<DtsOptions>,
    pub publint: Option<PublintOptions>,
    pub attw: Option<AttwOptions>,
    pub exports: Option<ExportsOptions>,
    pub report: Option<ReportOptions>,
    /// Only the first config of a fan-out carries `copy` and `on_success`.
    pub copy: Option<Vec<CopyEntry>>,
    pub on_success: Option<OnSuccess>,
    pub pkg: Option<Arc<PackageJson>>,
}

impl ResolvedConfig {
    pub fn manifest_path(&self) -> Option<&Path> {
        self.pkg.as_deref().map(PackageJson::path)
    }

    /// Short label for log lines: the config name, else the format.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("[{name}] {}", self.format),
            None => self.format.to_string(),
        }
    }
}

/// The outcome of resolving an invocation.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub configs: Vec<ResolvedConfig>,
    /// Every config file that contributed; watched for restarts.
    pub files: Vec<PathBuf>,
}

/// Resolves inline options against config files and defaults.
#[derive(Clone)]
pub struct Resolver {
    loader: Arc<Loader>,
    cwd: PathBuf,
    in_ci: bool,
}

impl Resolver {
    pub fn new(loader: Arc<Loader>) -> Result<Self> {
        Ok(Self {
            loader,
            cwd: std::env::current_dir()?,
            in_ci: is_in_ci(),
        })
    }

    /// Resolve relative paths against `cwd` instead of the process directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn with_ci(mut self, in_ci: bool) -> Self {
        self.in_ci = in_ci;
        self
    }

    pub fn loader(&self) -> &Arc<Loader> {
        &self.loader
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub async fn resolve(&self, inline: &InlineConfig) -> Result<Resolution> {
        tracing::debug!("inline config {:?}", inline.user);
        let root_cwd = self.absolute(inline.user.cwd.as_deref());
        let loaded = self.loader.load(inline, &root_cwd, None).await?;

        let mut files = Vec::new();
        match &loaded.file {
            Some(file) => {
                tracing::debug!("loaded root config file {}", file.display());
                files.push(file.clone());
            }
            None => tracing::debug!("no root config file found"),
        }

        let expansions = loaded
            .configs
            .into_iter()
            .map(|root| expand_workspace(&self.loader, root, inline, &self.cwd));
        let mut configs = Vec::new();
        for expanded in try_join_all(expansions).await? {
            files.extend(expanded.files);
            for config in expanded.configs {
                if config.workspace.is_some() && config.entry.is_none() {
                    continue;
                }
                configs.extend(self.resolve_user_config(config, inline)?);
            }
        }

        tracing::debug!("resolved {} configs", configs.len());
        Ok(Resolution { configs, files })
    }

    fn absolute(&self, path: Option<&Path>) -> PathBuf {
        match path {
            Some(path) => path_clean::clean(self.cwd.join(path)),
            None => self.cwd.clone(),
        }
    }

    /// Default, validate and fan out one user config. Returns nothing when
    /// the config is filtered out.
    pub fn resolve_user_config(
        &self,
        config: UserConfig,
        inline: &InlineConfig,
    ) -> Result<Vec<ResolvedConfig>> {
        let cwd = self.absolute(config.cwd.as_deref());
        let pkg = PackageJson::find(&cwd)?.map(Arc::new);

        let mut name = config.name.clone();
        if config.workspace.is_some() && name.is_none() {
            name = pkg.as_deref().and_then(PackageJson::name).map(str::to_string);
        }

        if let Some(filter) = &inline.filter {
            let relative = match cwd.strip_prefix(&self.cwd) {
                Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
                Ok(rel) => path_string(rel),
                Err(_) => path_string(&cwd),
            };
            if !ConfigFilter::new(filter)?.accepts(name.as_deref(), &relative) {
                tracing::debug!("[filter] skipping config {}", cwd.display());
                return Ok(Vec::new());
            }
        }

        let log_level = config.log_level.unwrap_or(if config.silent == Some(true) {
            LogLevel::Silent
        } else {
            LogLevel::Info
        });
        let fail_on_warn = config
            .fail_on_warn
            .unwrap_or(Toggle::Ci(CiOption::CiOnly))
            .resolve(self.in_ci);

        let unbundle = match (config.bundle, config.unbundle) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::DeprecatedConflict {
                    deprecated: "bundle",
                    canonical: "unbundle",
                });
            }
            (Some(bundle), None) => {
                tracing::warn!("`bundle` option is deprecated. Use `unbundle` instead.");
                !bundle
            }
            (None, unbundle) => unbundle.unwrap_or(false),
        };

        let node_protocol = match (config.remove_node_protocol, config.node_protocol) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::DeprecatedConflict {
                    deprecated: "removeNodeProtocol",
                    canonical: "nodeProtocol",
                });
            }
            (Some(remove), None) => {
                tracing::warn!(
                    "`removeNodeProtocol` option is deprecated. Use `nodeProtocol` instead."
                );
                if remove {
                    NodeProtocol::Strip
                } else {
                    NodeProtocol::Preserve
                }
            }
            (None, Some(NodeProtocolOption::Enabled(true))) => NodeProtocol::Add,
            (None, Some(NodeProtocolOption::Keyword(StripKeyword::Strip))) => NodeProtocol::Strip,
            (None, _) => NodeProtocol::Preserve,
        };

        let copy = match (config.public_dir, config.copy) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::DeprecatedConflict {
                    deprecated: "publicDir",
                    canonical: "copy",
                });
            }
            (Some(public_dir), None) => {
                tracing::warn!("`publicDir` is deprecated. Use `copy` instead.");
                Some(public_dir.into_vec())
            }
            (None, copy) => copy.map(OneOrMany::into_vec),
        };

        let out_dir = path_clean::clean(cwd.join(config.out_dir.as_deref().unwrap_or("dist")));
        let clean = match config.clean {
            None | Some(CleanOption::Enabled(true)) => vec![out_dir.to_string_lossy().into_owned()],
            Some(CleanOption::Enabled(false)) => Vec::new(),
            Some(CleanOption::Patterns(patterns)) => patterns,
        };

        let entry = resolve_entry(config.entry.as_ref(), &cwd)?;
        tracing::info!(
            "{}entry: {}",
            name.as_deref().map(|n| format!("[{n}] ")).unwrap_or_default(),
            entry
                .values()
                .map(|path| path_string(path.strip_prefix(&cwd).unwrap_or(path)))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let dts_default = pkg
            .as_deref()
            .is_some_and(|pkg| pkg.types().is_some() || pkg.has_exports_types());
        let dts: Option<DtsOptions> =
            resolve_feature_option(config.dts.as_ref(), dts_default.into(), self.in_ci);
        let publint: Option<PublintOptions> =
            resolve_feature_option(config.publint.as_ref(), false.into(), self.in_ci);
        let attw: Option<AttwOptions> =
            resolve_feature_option(config.attw.as_ref(), false.into(), self.in_ci);
        let exports: Option<ExportsOptions> =
            resolve_feature_option(config.exports.as_ref(), false.into(), self.in_ci);
        let report: Option<ReportOptions> =
            resolve_feature_option(config.report.as_ref(), true.into(), self.in_ci);

        if exports.is_some() && pkg.is_none() {
            return Err(ConfigError::ManifestRequired(cwd));
        }

        let target = resolve_target(config.target.as_ref(), pkg.as_deref());
        let tsconfig = resolve_tsconfig(config.tsconfig.as_ref(), &cwd);

        let external = patterns(config.external.as_ref())?;
        let no_external = patterns(config.no_external.as_ref())?;
        let inline_only = config
            .inline_only
            .as_ref()
            .map(|list| Pattern::parse_all(&list.to_vec()))
            .transpose()?;

        let ignore_watch = patterns(config.ignore_watch.as_ref())?
            .into_iter()
            .map(|pattern| match pattern {
                Pattern::Exact(path) => {
                    Pattern::Exact(path_clean::clean(cwd.join(path)).to_string_lossy().into_owned())
                }
                regex => regex,
            })
            .collect();

        let watch = match config.watch {
            None | Some(WatchOption::Enabled(false)) => WatchTarget::Disabled,
            Some(WatchOption::Enabled(true)) => WatchTarget::Cwd,
            Some(WatchOption::Paths(paths)) => WatchTarget::Paths(
                paths
                    .into_vec()
                    .into_iter()
                    .map(|path| path_clean::clean(cwd.join(path)))
                    .collect(),
            ),
        };

        let prefixes = config
            .env_prefix
            .as_ref()
            .map(OneOrMany::to_vec)
            .unwrap_or_else(|| vec![DEFAULT_ENV_PREFIX.to_string()]);
        let env = collect_env(&cwd, config.env_file.as_deref(), &prefixes, config.env.as_ref())?;

        let platform = config.platform.unwrap_or_default();
        let sourcemap = match config.sourcemap {
            None | Some(SourcemapOption::Enabled(false)) => SourcemapMode::Off,
            Some(SourcemapOption::Enabled(true)) => SourcemapMode::File,
            Some(SourcemapOption::Mode(SourcemapKeyword::Inline)) => SourcemapMode::Inline,
            Some(SourcemapOption::Mode(SourcemapKeyword::Hidden)) => SourcemapMode::Hidden,
        };

        let mut formats: Vec<Format> = Vec::new();
        for format in config
            .format
            .map(OneOrMany::into_vec)
            .unwrap_or_else(|| vec![Format::Es])
        {
            if !formats.contains(&format) {
                formats.push(format);
            }
        }

        let base = ResolvedConfig {
            id: ConfigId::next(),
            name,
            cwd,
            entry,
            format: formats.first().copied().unwrap_or(Format::Es),
            platform,
            target,
            out_dir,
            clean,
            sourcemap,
            minify: config.minify.unwrap_or(false),
            treeshake: config.treeshake.unwrap_or(true),
            external,
            no_external,
            inline_only,
            skip_node_modules_bundle: config.skip_node_modules_bundle.unwrap_or(false),
            alias: config.alias.unwrap_or_default(),
            define: config.define.unwrap_or_default(),
            env,
            tsconfig,
            shims: config.shims.unwrap_or(false),
            unbundle,
            node_protocol,
            fixed_extension: config.fixed_extension.unwrap_or(platform == Platform::Node),
            hash: config.hash.unwrap_or(true),
            cjs_default: config.cjs_default.unwrap_or(true),
            glob_import: config.glob_import.unwrap_or(true),
            global_name: config.global_name,
            log_level,
            fail_on_warn,
            watch,
            ignore_watch,
            dts,
            publint,
            attw,
            exports,
            report,
            copy,
            on_success: config.on_success,
            pkg,
        };

        Ok(fan_out(base, &formats))
    }
}

/// One config per format. Side effects that must happen once per user config
/// stay on the first.
fn fan_out(base: ResolvedConfig, formats: &[Format]) -> Vec<ResolvedConfig> {
    formats
        .iter()
        .enumerate()
        .map(|(index, format)| {
            let mut config = base.clone();
            config.format = *format;
            if index > 0 {
                config.id = ConfigId::next();
                config.copy = None;
                config.on_success = None;
            }
            config
        })
        .collect()
}

fn patterns(list: Option<&OneOrMany<String>>) -> Result<Vec<Pattern>> {
    match list {
        Some(list) => Pattern::parse_all(&list.to_vec()),
        None => Ok(Vec::new()),
    }
}

fn resolve_tsconfig(option: Option<&ConfigFileOption>, cwd: &Path) -> Option<PathBuf> {
    match option {
        Some(ConfigFileOption::Enabled(false)) => None,
        Some(ConfigFileOption::Path(path)) => {
            let path = path_clean::clean(cwd.join(path));
            if path.is_file() {
                Some(path)
            } else {
                tracing::warn!("tsconfig {} does not exist", path.display());
                None
            }
        }
        _ => cwd
            .ancestors()
            .map(|dir| dir.join("tsconfig.json"))
            .find(|candidate| candidate.is_file()),
    }
}

/// Resolve `inline` from the process working directory.
pub async fn resolve_config(inline: &InlineConfig) -> Result<Resolution> {
    Resolver::new(Arc::new(Loader::new()))?.resolve(inline).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/index.ts"), "export {}").unwrap();
        fs::write(dir.path().join("package.json"), r#"{ "name": "demo" }"#).unwrap();
        dir
    }

    fn resolver(dir: &TempDir) -> Resolver {
        Resolver::new(Arc::new(Loader::new()))
            .unwrap()
            .with_cwd(dir.path())
            .with_ci(false)
    }

    fn user(value: serde_json::Value) -> UserConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn applies_defaults() {
        let dir = project();
        let configs = resolver(&dir)
            .resolve_user_config(UserConfig::default(), &InlineConfig::default())
            .unwrap();
        assert_eq!(configs.len(), 1);

        let config = &configs[0];
        assert_eq!(config.format, Format::Es);
        assert_eq!(config.platform, Platform::Node);
        assert_eq!(config.out_dir, dir.path().join("dist"));
        assert_eq!(config.clean, vec![dir.path().join("dist").to_string_lossy().into_owned()]);
        assert!(config.treeshake);
        assert!(config.fixed_extension);
        assert!(config.hash);
        assert!(config.report.is_some());
        assert!(config.dts.is_none());
        assert!(config.publint.is_none());
        assert!(!config.fail_on_warn);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.node_protocol, NodeProtocol::Preserve);
        assert_eq!(config.entry["index"], dir.path().join("src/index.ts"));
    }

    #[test]
    fn each_format_gets_its_own_config() {
        let dir = project();
        let config = user(serde_json::json!({
            "format": ["es", "cjs", "iife"],
            "copy": ["README.md"],
            "onSuccess": "echo done"
        }));
        let configs = resolver(&dir)
            .resolve_user_config(config, &InlineConfig::default())
            .unwrap();

        let formats: Vec<Format> = configs.iter().map(|c| c.format).collect();
        assert_eq!(formats, vec![Format::Es, Format::Cjs, Format::Iife]);
        assert!(configs[0].copy.is_some());
        assert!(configs[0].on_success.is_some());
        for later in &configs[1..] {
            assert!(later.copy.is_none());
            assert!(later.on_success.is_none());
            assert_eq!(later.out_dir, configs[0].out_dir);
            assert_eq!(later.entry, configs[0].entry);
            assert_ne!(later.id, configs[0].id);
        }
    }

    /// Log sink shared with a scoped subscriber.
    #[derive(Clone, Default)]
    struct Captured(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn record<T>(&self, f: impl FnOnce() -> T) -> T {
            let sink = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_ansi(false)
                .with_max_level(tracing::Level::WARN)
                .with_writer(move || sink.clone())
                .finish();
            tracing::subscriber::with_default(subscriber, f)
        }

        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    #[test]
    fn bundle_false_migrates_to_unbundle() {
        let dir = project();
        let logs = Captured::default();
        let configs = logs
            .record(|| {
                resolver(&dir).resolve_user_config(
                    user(serde_json::json!({ "bundle": false })),
                    &InlineConfig::default(),
                )
            })
            .unwrap();
        assert!(configs[0].unbundle);

        let text = logs.text();
        assert!(text.contains("WARN"), "{text}");
        assert!(text.contains("`bundle` option is deprecated. Use `unbundle` instead."), "{text}");
    }

    #[test]
    fn canonical_options_log_no_deprecation() {
        let dir = project();
        let logs = Captured::default();
        logs.record(|| {
            resolver(&dir).resolve_user_config(
                user(serde_json::json!({ "unbundle": true, "nodeProtocol": "strip" })),
                &InlineConfig::default(),
            )
        })
        .unwrap();
        assert!(!logs.text().contains("deprecated"), "{}", logs.text());
    }

    #[test]
    fn deprecated_pairs_conflict() {
        let dir = project();
        for value in [
            serde_json::json!({ "bundle": false, "unbundle": true }),
            serde_json::json!({ "removeNodeProtocol": true, "nodeProtocol": "strip" }),
            serde_json::json!({ "publicDir": "public", "copy": "assets" }),
        ] {
            let err = resolver(&dir)
                .resolve_user_config(user(value), &InlineConfig::default())
                .unwrap_err();
            assert!(matches!(err, ConfigError::DeprecatedConflict { .. }), "{err}");
        }
    }

    #[test]
    fn remove_node_protocol_means_strip() {
        let dir = project();
        let configs = resolver(&dir)
            .resolve_user_config(
                user(serde_json::json!({ "removeNodeProtocol": true })),
                &InlineConfig::default(),
            )
            .unwrap();
        assert_eq!(configs[0].node_protocol, NodeProtocol::Strip);
    }

    #[test]
    fn silent_maps_to_log_level() {
        let dir = project();
        let configs = resolver(&dir)
            .resolve_user_config(user(serde_json::json!({ "silent": true })), &InlineConfig::default())
            .unwrap();
        assert_eq!(configs[0].log_level, LogLevel::Silent);
    }

    #[test]
    fn dts_follows_manifest_types() {
        let dir = project();
        fs::write(
            dir.path().join("package.json"),
            r#"{ "name": "demo", "types": "./dist/index.d.mts" }"#,
        )
        .unwrap();
        let configs = resolver(&dir)
            .resolve_user_config(UserConfig::default(), &InlineConfig::default())
            .unwrap();
        assert!(configs[0].dts.is_some());
    }

    #[test]
    fn ci_only_features_follow_ci() {
        let dir = project();
        let config = user(serde_json::json!({ "publint": "ci-only" }));
        let local = resolver(&dir)
            .resolve_user_config(config.clone(), &InlineConfig::default())
            .unwrap();
        assert!(local[0].publint.is_none());
        let ci = resolver(&dir)
            .with_ci(true)
            .resolve_user_config(config, &InlineConfig::default())
            .unwrap();
        assert!(ci[0].publint.is_some());
        assert!(ci[0].fail_on_warn);
    }

    #[test]
    fn filter_drops_other_packages() {
        let dir = project();
        let inline = InlineConfig {
            filter: Some(OneOrMany::Many(vec!["other".into()])),
            ..Default::default()
        };
        let configs = resolver(&dir)
            .resolve_user_config(user(serde_json::json!({ "name": "demo" })), &inline)
            .unwrap();
        assert!(configs.is_empty());

        let inline = InlineConfig {
            filter: Some(OneOrMany::Many(vec![".".into()])),
            ..Default::default()
        };
        let configs = resolver(&dir)
            .resolve_user_config(UserConfig::default(), &inline)
            .unwrap();
        assert_eq!(configs.len(), 1);
    }

    #[test]
    fn exports_require_a_manifest() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/index.ts"), "").unwrap();
        let err = resolver(&dir)
            .resolve_user_config(user(serde_json::json!({ "exports": true })), &InlineConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::ManifestRequired(_)));
    }

    #[test]
    fn ignore_watch_resolves_paths_and_regexes() {
        let dir = project();
        let configs = resolver(&dir)
            .resolve_user_config(
                user(serde_json::json!({ "ignoreWatch": ["fixtures", "/\\.snap$/"] })),
                &InlineConfig::default(),
            )
            .unwrap();
        let ignore = &configs[0].ignore_watch;
        assert_eq!(
            ignore[0],
            Pattern::Exact(dir.path().join("fixtures").to_string_lossy().into_owned())
        );
        assert!(ignore[1].matches("a/b.snap"));
    }
}
