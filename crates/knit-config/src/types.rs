//! User-facing configuration types.
//!
//! [`UserConfig`] is what a config file, a `package.json#knit` field, or the
//! command line describes. Every field is optional; defaults are applied when a
//! config is resolved into one [`ResolvedConfig`](crate::ResolvedConfig) per
//! output format.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::ResolvedConfig;

/// A value that may be written either as a single item or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

impl<T: Clone> OneOrMany<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.clone().into_vec()
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        OneOrMany::Many(values)
    }
}

/// Output module format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// ECMAScript modules
    #[serde(alias = "esm", alias = "module")]
    Es,
    /// CommonJS
    #[serde(alias = "commonjs")]
    Cjs,
    /// Immediately invoked function expression
    Iife,
    /// Universal module definition
    Umd,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Es => "es",
            Format::Cjs => "cjs",
            Format::Iife => "iife",
            Format::Umd => "umd",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target runtime platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Node,
    Neutral,
    Browser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Silent,
    Error,
    Warn,
    #[default]
    Info,
}

/// Which config parser evaluates script config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigLoader {
    /// Static formats are parsed in-process; scripts use the native runtime
    /// when it can execute them and the transform loader otherwise.
    #[default]
    Auto,
    /// Import the file with the installed `node` runtime.
    Native,
    /// Import the file through a TypeScript-transforming loader (`tsx`).
    Transform,
}

impl ConfigLoader {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLoader::Auto => "auto",
            ConfigLoader::Native => "native",
            ConfigLoader::Transform => "transform",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CiOption {
    CiOnly,
    LocalOnly,
}

/// `true`, `false`, `'ci-only'` or `'local-only'`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Toggle {
    Bool(bool),
    Ci(CiOption),
}

impl Toggle {
    pub fn resolve(self, in_ci: bool) -> bool {
        match self {
            Toggle::Bool(value) => value,
            Toggle::Ci(CiOption::CiOnly) => in_ci,
            Toggle::Ci(CiOption::LocalOnly) => !in_ci,
        }
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        Toggle::Bool(value)
    }
}

/// A feature that can be toggled or configured with an options object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureOption<T> {
    Toggle(Toggle),
    Options(T),
}

impl<T> From<bool> for FeatureOption<T> {
    fn from(value: bool) -> Self {
        FeatureOption::Toggle(Toggle::Bool(value))
    }
}

/// Options objects that can carry their own `enabled` switch.
pub trait FeatureOptions: Default + Clone {
    fn enabled(&self) -> Option<Toggle>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DevExports {
    Enabled(bool),
    Condition(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportsOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<Toggle>,
    /// Point exports at source files during development.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_exports: Option<DevExports>,
    /// Export every file (`./*`) instead of only `./package.json`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub all: bool,
}

impl ExportsOptions {
    /// Whether any option besides `enabled` was set.
    pub fn is_customized(&self) -> bool {
        self.dev_exports.is_some() || self.all
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckLevel {
    Suggestion,
    #[default]
    Warning,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublintOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<Toggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<CheckLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttwProfile {
    Strict,
    Node16,
    EsmOnly,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttwOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<Toggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<AttwProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<CheckLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DtsOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<Toggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sourcemap: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<Toggle>,
    /// Only list entry chunks.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub entries_only: bool,
}

macro_rules! feature_options {
    ($($ty:ty),* $(,)?) => {
        $(impl FeatureOptions for $ty {
            fn enabled(&self) -> Option<Toggle> {
                self.enabled
            }
        })*
    };
}

feature_options!(ExportsOptions, PublintOptions, AttwOptions, DtsOptions, ReportOptions);

/// Entry points: a path, a list of paths/globs, or a map from output name to
/// path. Map keys containing `*` are glob templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryInput {
    Single(String),
    List(Vec<String>),
    Map(IndexMap<String, OneOrMany<String>>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CopyEntry {
    Path(String),
    Pair { from: String, to: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CleanOption {
    Enabled(bool),
    Patterns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WatchOption {
    Enabled(bool),
    Paths(OneOrMany<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetOption {
    Enabled(bool),
    Targets(OneOrMany<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StripKeyword {
    Strip,
}

/// `nodeProtocol`: `true` adds the `node:` prefix, `'strip'` removes it,
/// `false` leaves imports alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeProtocolOption {
    Enabled(bool),
    Keyword(StripKeyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcemapKeyword {
    Inline,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourcemapOption {
    Enabled(bool),
    Mode(SourcemapKeyword),
}

/// `config`: `false` disables loading, `true` discovers, a path overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigFileOption {
    Enabled(bool),
    Path(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    /// Member directories (globs), or `"auto"` to discover every
    /// `package.json` below the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<OneOrMany<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<OneOrMany<String>>,
    /// Config file used for every member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigFileOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkspaceOption {
    Enabled(bool),
    Include(OneOrMany<String>),
    Config(WorkspaceConfig),
}

impl WorkspaceOption {
    /// Normalize to a descriptor, or `None` when workspace mode is off.
    pub fn normalize(&self) -> Option<WorkspaceConfig> {
        match self {
            WorkspaceOption::Enabled(false) => None,
            WorkspaceOption::Enabled(true) => Some(WorkspaceConfig {
                include: None,
                exclude: None,
                config: None,
            }),
            WorkspaceOption::Include(include) => Some(WorkspaceConfig {
                include: Some(include.clone()),
                exclude: None,
                config: None,
            }),
            WorkspaceOption::Config(config) => Some(config.clone()),
        }
    }
}

/// Callback form of the success hook. The token is cancelled when a newer
/// build supersedes this one.
pub type SuccessCallback = Arc<
    dyn Fn(Arc<ResolvedConfig>, CancellationToken) -> BoxFuture<'static, CallbackResult>
        + Send
        + Sync,
>;

pub type CallbackResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Runs after every successful build of a config.
#[derive(Clone)]
pub enum OnSuccess {
    /// Shell command, killed with its process tree when superseded.
    Command(String),
    Callback(SuccessCallback),
}

impl fmt::Debug for OnSuccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnSuccess::Command(command) => f.debug_tuple("Command").field(command).finish(),
            OnSuccess::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl PartialEq for OnSuccess {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (OnSuccess::Command(a), OnSuccess::Command(b)) => a == b,
            (OnSuccess::Callback(a), OnSuccess::Callback(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Serialize for OnSuccess {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OnSuccess::Command(command) => serializer.serialize_str(command),
            OnSuccess::Callback(_) => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for OnSuccess {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(OnSuccess::Command)
    }
}

/// User-authored build options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<EntryInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<OneOrMany<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_external: Option<OneOrMany<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_only: Option<OneOrMany<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_node_modules_bundle: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tsconfig: Option<ConfigFileOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_prefix: Option<OneOrMany<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub define: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shims: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treeshake: Option<bool>,
    /// Deprecated in favor of `nodeProtocol`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_node_protocol: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_protocol: Option<NodeProtocolOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OneOrMany<Format>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sourcemap: Option<SourcemapOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean: Option<CleanOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unbundle: Option<bool>,
    /// Deprecated in favor of `unbundle`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_extension: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cjs_default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Deprecated in favor of `logLevel`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on_warn: Option<Toggle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch: Option<WatchOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_watch: Option<OneOrMany<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_success: Option<OnSuccess>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dts: Option<FeatureOption<DtsOptions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publint: Option<FeatureOption<PublintOptions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attw: Option<FeatureOption<AttwOptions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<FeatureOption<ReportOptions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glob_import: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports: Option<FeatureOption<ExportsOptions>>,
    /// Deprecated in favor of `copy`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_dir: Option<OneOrMany<CopyEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy: Option<OneOrMany<CopyEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<WorkspaceOption>,
}

/// Options that only exist for a single invocation.
#[derive(Debug, Clone, Default)]
pub struct InlineConfig {
    /// Build options given on the command line or through the API. They take
    /// precedence over every loaded config file.
    pub user: UserConfig,
    pub config: Option<ConfigFileOption>,
    pub config_loader: Option<ConfigLoader>,
    /// Workspace package filter: `/regex/`, a substring, or a list of them.
    pub filter: Option<OneOrMany<String>>,
}

impl InlineConfig {
    pub fn new(user: UserConfig) -> Self {
        Self {
            user,
            ..Default::default()
        }
    }

    /// JSON view handed to config functions.
    pub fn to_json(&self) -> Value {
        let mut value = serde_json::to_value(&self.user).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            if let Some(config) = &self.config {
                map.insert(
                    "config".to_string(),
                    serde_json::to_value(config).unwrap_or(Value::Null),
                );
            }
            if let Some(loader) = self.config_loader {
                map.insert("configLoader".to_string(), Value::from(loader.as_str()));
            }
            if let Some(filter) = &self.filter {
                map.insert(
                    "filter".to_string(),
                    serde_json::to_value(filter).unwrap_or(Value::Null),
                );
            }
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_accepts_aliases() {
        let formats: Vec<Format> =
            serde_json::from_value(json!(["esm", "module", "es", "commonjs", "cjs", "iife"]))
                .unwrap();
        assert_eq!(
            formats,
            vec![Format::Es, Format::Es, Format::Es, Format::Cjs, Format::Cjs, Format::Iife]
        );
    }

    #[test]
    fn feature_option_parses_every_shape() {
        let on: FeatureOption<ExportsOptions> = serde_json::from_value(json!(true)).unwrap();
        assert_eq!(on, FeatureOption::Toggle(Toggle::Bool(true)));

        let ci: FeatureOption<PublintOptions> = serde_json::from_value(json!("ci-only")).unwrap();
        assert_eq!(ci, FeatureOption::Toggle(Toggle::Ci(CiOption::CiOnly)));

        let opts: FeatureOption<ExportsOptions> =
            serde_json::from_value(json!({ "devExports": "development" })).unwrap();
        match opts {
            FeatureOption::Options(opts) => assert_eq!(
                opts.dev_exports,
                Some(DevExports::Condition("development".to_string()))
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn toggle_resolves_against_ci() {
        assert!(Toggle::Ci(CiOption::CiOnly).resolve(true));
        assert!(!Toggle::Ci(CiOption::CiOnly).resolve(false));
        assert!(Toggle::Ci(CiOption::LocalOnly).resolve(false));
        assert!(!Toggle::Bool(false).resolve(true));
    }

    #[test]
    fn user_config_parses_camel_case_fields() {
        let config: UserConfig = serde_json::from_value(json!({
            "entry": { "cli": "src/cli.ts" },
            "format": ["es", "cjs"],
            "outDir": "lib",
            "onSuccess": "node lib/cli.mjs",
            "workspace": ["packages/*"],
            "nodeProtocol": "strip"
        }))
        .unwrap();

        assert_eq!(config.out_dir.as_deref(), Some("lib"));
        assert_eq!(
            config.on_success,
            Some(OnSuccess::Command("node lib/cli.mjs".to_string()))
        );
        assert_eq!(
            config.node_protocol,
            Some(NodeProtocolOption::Keyword(StripKeyword::Strip))
        );
        assert!(matches!(config.workspace, Some(WorkspaceOption::Include(_))));
        assert!(matches!(config.entry, Some(EntryInput::Map(_))));
    }

    #[test]
    fn workspace_true_normalizes_to_empty_descriptor() {
        let normalized = WorkspaceOption::Enabled(true).normalize().unwrap();
        assert!(normalized.include.is_none());
        assert!(WorkspaceOption::Enabled(false).normalize().is_none());
    }
}
