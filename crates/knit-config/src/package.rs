//! `package.json` reading.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

pub const MANIFEST_FILE: &str = "package.json";

/// Field of `package.json` that may hold an embedded config.
pub const CONFIG_FIELD: &str = "knit";

/// A parsed package manifest. Key order of the original file is kept so the
/// manifest can be written back without reshuffling it.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageJson {
    path: PathBuf,
    data: Map<String, Value>,
}

impl PackageJson {
    pub fn from_value(path: impl Into<PathBuf>, value: Value) -> Result<Self> {
        let path = path.into();
        match value {
            Value::Object(data) => Ok(Self { path, data }),
            _ => Err(ConfigError::InvalidManifest {
                path,
                message: "expected a JSON object".to_string(),
            }),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let value: Value =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidManifest {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Self::from_value(path, value)
    }

    /// Find the nearest `package.json` at or above `dir`.
    pub fn find(dir: &Path) -> Result<Option<Self>> {
        for ancestor in dir.ancestors() {
            let candidate = ancestor.join(MANIFEST_FILE);
            if candidate.is_file() {
                return Self::read(&candidate).map(Some);
            }
        }
        Ok(None)
    }

    /// Absolute path of the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn version(&self) -> Option<&str> {
        self.str_field("version")
    }

    /// `true` when `"type": "module"`.
    pub fn is_module(&self) -> bool {
        self.str_field("type") == Some("module")
    }

    pub fn main(&self) -> Option<&str> {
        self.str_field("main")
    }

    pub fn module(&self) -> Option<&str> {
        self.str_field("module")
    }

    pub fn types(&self) -> Option<&str> {
        self.str_field("types").or_else(|| self.str_field("typings"))
    }

    pub fn exports(&self) -> Option<&Value> {
        self.data.get("exports")
    }

    pub fn engines_node(&self) -> Option<&str> {
        self.data
            .get("engines")
            .and_then(|engines| engines.get("node"))
            .and_then(Value::as_str)
    }

    /// `dependencies` and `peerDependencies` names, in manifest order.
    pub fn production_deps(&self) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        for field in ["dependencies", "peerDependencies"] {
            if let Some(Value::Object(map)) = self.data.get(field) {
                for name in map.keys() {
                    if !deps.contains(name) {
                        deps.push(name.clone());
                    }
                }
            }
        }
        deps
    }

    /// Whether `exports` declares a `types` condition at the top level or
    /// under `"."`.
    pub fn has_exports_types(&self) -> bool {
        let Some(Value::Object(exports)) = self.exports() else {
            return false;
        };
        if exports.contains_key("types") {
            return true;
        }
        matches!(exports.get("."), Some(Value::Object(root)) if root.contains_key("types"))
    }

    /// The embedded config field, if present and not `null`.
    pub fn config_field(&self) -> Option<&Value> {
        self.data.get(CONFIG_FIELD).filter(|value| !value.is_null())
    }
}
