//! Config file loading.
//!
//! A config file is located by walking up from the working directory, then
//! evaluated by a [`ConfigParser`]. Static formats (JSON, TOML and the
//! `package.json#knit` field) are parsed in-process; scripts are evaluated by
//! a `node` subprocess that prints the exported value as JSON.
//!
//! Parsed exports are cached per `(path, generation)`. Bumping the generation
//! with [`Loader::next_generation`] makes every later load re-read its file.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::OnceCell;

use crate::error::{ConfigError, Result};
use crate::package::{CONFIG_FIELD, MANIFEST_FILE, PackageJson};
use crate::types::{ConfigFileOption, ConfigLoader, InlineConfig, UserConfig};

pub const CONFIG_BASENAME: &str = "knit.config";

/// Extensions tried for `knit.config.*`, in order.
pub const CONFIG_EXTENSIONS: &[&str] = &["ts", "mts", "cts", "js", "mjs", "cjs", "json", "toml"];

/// A function config: receives the inline options and returns the export.
pub type ConfigFn =
    Arc<dyn Fn(&InlineConfig) -> BoxFuture<'static, Result<ConfigExport>> + Send + Sync>;

/// The value a config source exports.
#[derive(Clone)]
pub enum ConfigExport {
    Object(Box<UserConfig>),
    Array(Vec<ConfigExport>),
    Function(ConfigFn),
}

impl fmt::Debug for ConfigExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigExport::Object(config) => f.debug_tuple("Object").field(config).finish(),
            ConfigExport::Array(items) => f.debug_tuple("Array").field(items).finish(),
            ConfigExport::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl From<UserConfig> for ConfigExport {
    fn from(config: UserConfig) -> Self {
        ConfigExport::Object(Box::new(config))
    }
}

impl ConfigExport {
    /// Interpret an evaluated JSON value.
    pub fn from_value(path: &Path, value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(ConfigExport::Array(Vec::new())),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(_) => object(path, item),
                    other => Err(ConfigError::parse(
                        path,
                        format!("expected a config object in the array, found {other}"),
                    )),
                })
                .collect::<Result<Vec<_>>>()
                .map(ConfigExport::Array),
            Value::Object(_) => object(path, value),
            other => Err(ConfigError::parse(
                path,
                format!("expected a config object, found {other}"),
            )),
        }
    }

    /// Call a function export and flatten the result into a list of configs.
    /// An empty list becomes one empty config.
    pub async fn into_configs(self, inline: &InlineConfig) -> Result<Vec<UserConfig>> {
        let export = match self {
            ConfigExport::Function(function) => match function(inline).await? {
                ConfigExport::Function(_) => return Err(ConfigError::NestedFunction),
                export => export,
            },
            export => export,
        };

        let mut configs = match export {
            ConfigExport::Object(config) => vec![*config],
            ConfigExport::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| match item {
                    ConfigExport::Object(config) => Ok(*config),
                    ConfigExport::Function(_) => Err(ConfigError::FunctionInArray { index }),
                    ConfigExport::Array(_) => Err(ConfigError::invalid(
                        "config",
                        format!("nested array at index {index}"),
                    )),
                })
                .collect::<Result<Vec<_>>>()?,
            ConfigExport::Function(_) => return Err(ConfigError::NestedFunction),
        };
        if configs.is_empty() {
            configs.push(UserConfig::default());
        }
        Ok(configs)
    }
}

fn object(path: &Path, value: Value) -> Result<ConfigExport> {
    serde_json::from_value::<UserConfig>(value)
        .map(ConfigExport::from)
        .map_err(|e| ConfigError::parse(path, e))
}

/// Evaluates one config file.
#[async_trait]
pub trait ConfigParser: Send + Sync {
    fn name(&self) -> &'static str;

    async fn parse(&self, path: &Path, inline: &InlineConfig) -> Result<ConfigExport>;
}

/// JSON, TOML and the `package.json` field.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticParser;

#[async_trait]
impl ConfigParser for StaticParser {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn parse(&self, path: &Path, _inline: &InlineConfig) -> Result<ConfigExport> {
        if is_manifest(path) {
            let pkg = PackageJson::read(path)?;
            let field = pkg.config_field().cloned().unwrap_or(Value::Null);
            return ConfigExport::from_value(path, field);
        }

        let content = tokio::fs::read_to_string(path).await?;
        let value: Value = match extension(path) {
            "json" => serde_json::from_str(&content).map_err(|e| ConfigError::parse(path, e))?,
            "toml" => {
                let table: toml::Table =
                    toml::from_str(&content).map_err(|e| ConfigError::parse(path, e))?;
                serde_json::to_value(table).map_err(|e| ConfigError::parse(path, e))?
            }
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        ConfigExport::from_value(path, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeMode {
    /// Plain `node` import; TypeScript needs native type stripping.
    Native,
    /// Import through the `tsx` loader.
    Transform,
}

/// Evaluates script configs with a `node` subprocess.
#[derive(Debug, Clone)]
pub struct NodeParser {
    mode: NodeMode,
    node: PathBuf,
}

/// `argv[1]` is the config path, `argv[2]` the inline options as JSON.
const NODE_SCRIPT: &str = r#"
import { pathToFileURL } from 'node:url';
const [file, inline] = process.argv.slice(1);
const mod = await import(pathToFileURL(file).href);
let config = mod.default ?? mod;
if (typeof config === 'function') {
  config = await config(JSON.parse(inline));
  if (typeof config === 'function') {
    console.error('KNIT_NESTED_FUNCTION');
    process.exit(3);
  }
}
if (Array.isArray(config)) {
  const index = config.findIndex((item) => typeof item === 'function');
  if (index !== -1) {
    console.error(`KNIT_FUNCTION_IN_ARRAY:${index}`);
    process.exit(3);
  }
}
process.stdout.write(JSON.stringify(config ?? null));
"#;

impl NodeParser {
    pub fn new(mode: NodeMode) -> Self {
        Self {
            mode,
            node: PathBuf::from("node"),
        }
    }

    /// Use a specific `node` binary.
    pub fn with_node(mut self, node: impl Into<PathBuf>) -> Self {
        self.node = node.into();
        self
    }
}

#[async_trait]
impl ConfigParser for NodeParser {
    fn name(&self) -> &'static str {
        match self.mode {
            NodeMode::Native => "native",
            NodeMode::Transform => "transform",
        }
    }

    async fn parse(&self, path: &Path, inline: &InlineConfig) -> Result<ConfigExport> {
        let mut command = Command::new(&self.node);
        if self.mode == NodeMode::Transform {
            command.args(["--import", "tsx"]);
        }
        command
            .args(["--input-type=module", "-e", NODE_SCRIPT])
            .arg(path)
            .arg(inline.to_json().to_string())
            .current_dir(path.parent().unwrap_or(Path::new(".")))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        tracing::debug!("evaluating {} with the {} loader", path.display(), self.name());
        let output = command.output().await.map_err(|e| ConfigError::Evaluation {
            path: path.to_path_buf(),
            message: format!("failed to run `{}`: {e}", self.node.display()),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.evaluation_error(path, stderr.trim()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let value: Value =
            serde_json::from_str(stdout.trim()).map_err(|e| ConfigError::parse(path, e))?;
        ConfigExport::from_value(path, value)
    }
}

impl NodeParser {
    fn evaluation_error(&self, path: &Path, stderr: &str) -> ConfigError {
        if stderr.contains("KNIT_NESTED_FUNCTION") {
            return ConfigError::NestedFunction;
        }
        if let Some(index) = stderr
            .split("KNIT_FUNCTION_IN_ARRAY:")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|index| index.parse().ok())
        {
            return ConfigError::FunctionInArray { index };
        }
        let missing = stderr.contains("Cannot find module")
            || stderr.contains("ERR_MODULE_NOT_FOUND")
            || stderr.contains("ERR_UNKNOWN_FILE_EXTENSION");
        if missing && self.mode == NodeMode::Native {
            return ConfigError::ModuleNotFound {
                path: path.to_path_buf(),
                message: stderr.to_string(),
                suggestion: ConfigLoader::Transform.as_str(),
            };
        }
        ConfigError::Evaluation {
            path: path.to_path_buf(),
            message: stderr.to_string(),
        }
    }
}

static NODE_STRIPS_TYPES: OnceCell<bool> = OnceCell::const_new();

/// Whether the installed `node` can import TypeScript directly.
async fn node_strips_types() -> bool {
    *NODE_STRIPS_TYPES
        .get_or_init(|| async {
            match Command::new("node")
                .args(["-p", "Boolean(process.features.typescript)"])
                .stdin(Stdio::null())
                .output()
                .await
            {
                Ok(output) => {
                    output.status.success() && String::from_utf8_lossy(&output.stdout).trim() == "true"
                }
                Err(e) => {
                    tracing::debug!("node is not available: {e}");
                    false
                }
            }
        })
        .await
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|ext| ext.to_str()).unwrap_or("")
}

fn is_manifest(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == MANIFEST_FILE)
}

/// Pick the parser for a config file.
pub async fn select_parser(loader: ConfigLoader, path: &Path) -> Arc<dyn ConfigParser> {
    if is_manifest(path) || matches!(extension(path), "json" | "toml") {
        return Arc::new(StaticParser);
    }
    let mode = match loader {
        ConfigLoader::Native => NodeMode::Native,
        ConfigLoader::Transform => NodeMode::Transform,
        ConfigLoader::Auto => match extension(path) {
            "ts" | "mts" | "cts" if !node_strips_types().await => NodeMode::Transform,
            _ => NodeMode::Native,
        },
    };
    Arc::new(NodeParser::new(mode))
}

/// Result of loading config for one directory.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub configs: Vec<UserConfig>,
    /// The file the configs came from, if any.
    pub file: Option<PathBuf>,
}

/// Locates, parses and caches config files.
pub struct Loader {
    generation: AtomicU64,
    cache: Mutex<HashMap<(PathBuf, u64), ConfigExport>>,
    script_parser: Option<Arc<dyn ConfigParser>>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            cache: Mutex::new(HashMap::new()),
            script_parser: None,
        }
    }

    /// Evaluate script configs with `parser` instead of `node`.
    pub fn with_script_parser(mut self, parser: Arc<dyn ConfigParser>) -> Self {
        self.script_parser = Some(parser);
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Invalidate every cached export.
    pub fn next_generation(&self) -> u64 {
        let next = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.cache.lock().retain(|(_, generation), _| *generation >= next);
        next
    }

    /// Load the configs that apply to `cwd`.
    ///
    /// `stop_at` bounds the upward search; that directory itself is not
    /// searched.
    pub async fn load(
        &self,
        inline: &InlineConfig,
        cwd: &Path,
        stop_at: Option<&Path>,
    ) -> Result<LoadedConfig> {
        let mut search_dir = cwd.to_path_buf();
        let mut explicit = None;

        match &inline.config {
            Some(ConfigFileOption::Enabled(false)) => {
                return Ok(LoadedConfig {
                    configs: vec![UserConfig::default()],
                    file: None,
                });
            }
            Some(ConfigFileOption::Path(path)) => {
                let resolved = path_clean::clean(cwd.join(path));
                if resolved.is_file() {
                    explicit = Some(resolved);
                } else if resolved.is_dir() {
                    search_dir = resolved;
                }
            }
            _ => {}
        }

        let file = match explicit {
            Some(file) => Some(file),
            None => discover(&search_dir, stop_at)?,
        };
        let Some(file) = file else {
            return Ok(LoadedConfig {
                configs: vec![UserConfig::default()],
                file: None,
            });
        };

        let export = self.parse_cached(&file, inline).await?;
        let configs = export.into_configs(inline).await?;
        tracing::info!("Using knit config: {}", file.display());
        Ok(LoadedConfig {
            configs,
            file: Some(file),
        })
    }

    async fn parse_cached(&self, file: &Path, inline: &InlineConfig) -> Result<ConfigExport> {
        let key = (file.to_path_buf(), self.generation());
        if let Some(export) = self.cache.lock().get(&key) {
            return Ok(export.clone());
        }

        let parser = match &self.script_parser {
            Some(parser) if !is_manifest(file) && !matches!(extension(file), "json" | "toml") => {
                parser.clone()
            }
            _ => select_parser(inline.config_loader.unwrap_or_default(), file).await,
        };
        let export = parser.parse(file, inline).await?;
        self.cache.lock().insert(key, export.clone());
        Ok(export)
    }
}

/// Find `knit.config.*` in `dir` or above, then fall back to the nearest
/// `package.json` that carries a `knit` field.
pub fn discover(dir: &Path, stop_at: Option<&Path>) -> Result<Option<PathBuf>> {
    let dirs: Vec<&Path> = dir
        .ancestors()
        .take_while(|ancestor| stop_at != Some(*ancestor))
        .collect();

    for dir in &dirs {
        for ext in CONFIG_EXTENSIONS {
            let candidate = dir.join(format!("{CONFIG_BASENAME}.{ext}"));
            if candidate.is_file() {
                return Ok(Some(candidate));
            }
        }
    }

    for dir in &dirs {
        let manifest = dir.join(MANIFEST_FILE);
        if manifest.is_file() {
            let pkg = PackageJson::read(&manifest)?;
            if pkg.config_field().is_some() {
                tracing::debug!("found `{CONFIG_FIELD}` field in {}", manifest.display());
                return Ok(Some(manifest));
            }
        }
    }
    Ok(None)
}
