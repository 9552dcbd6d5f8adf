//! Compile-time environment variables.
//!
//! Variables come from three places, later ones winning: the env file, the
//! process environment (only names matching an allowed prefix), and the
//! explicit `env` map of the config.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::error::{ConfigError, Result};

pub const DEFAULT_ENV_PREFIX: &str = "KNIT_";

/// Collect the env map for one config.
pub fn collect_env(
    cwd: &Path,
    env_file: Option<&str>,
    prefixes: &[String],
    explicit: Option<&BTreeMap<String, Value>>,
) -> Result<BTreeMap<String, String>> {
    let allowed = |key: &str| prefixes.iter().any(|prefix| key.starts_with(prefix.as_str()));
    let mut env = BTreeMap::new();

    if let Some(file) = env_file {
        let path = cwd.join(file);
        let entries = dotenvy::from_path_iter(&path).map_err(|e| ConfigError::EnvFile {
            path: path.clone(),
            message: e.to_string(),
        })?;
        for entry in entries {
            let (key, value) = entry.map_err(|e| ConfigError::EnvFile {
                path: path.clone(),
                message: e.to_string(),
            })?;
            if allowed(&key) {
                env.insert(key, value);
            }
        }
        tracing::debug!("loaded env file {}", path.display());
    }

    for (key, value) in std::env::vars() {
        if allowed(&key) {
            env.insert(key, value);
        }
    }

    if let Some(explicit) = explicit {
        for (key, value) in explicit {
            env.insert(key.clone(), value_to_string(value));
        }
    }

    Ok(env)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn prefixes() -> Vec<String> {
        vec![DEFAULT_ENV_PREFIX.to_string()]
    }

    #[test]
    #[serial]
    fn precedence_is_file_then_process_then_config() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(".env"),
            "KNIT_FROM_FILE=file\nKNIT_SHARED=file\nKNIT_OVERRIDE=file\nOTHER=hidden\n",
        )
        .unwrap();

        // SAFETY: serialized with every other test touching the environment.
        unsafe {
            std::env::set_var("KNIT_SHARED", "process");
            std::env::set_var("KNIT_OVERRIDE", "process");
        }

        let explicit = BTreeMap::from([
            ("KNIT_OVERRIDE".to_string(), Value::from("config")),
            ("DEBUG".to_string(), Value::from(true)),
        ]);
        let env = collect_env(dir.path(), Some(".env"), &prefixes(), Some(&explicit)).unwrap();

        unsafe {
            std::env::remove_var("KNIT_SHARED");
            std::env::remove_var("KNIT_OVERRIDE");
        }

        assert_eq!(env["KNIT_FROM_FILE"], "file");
        assert_eq!(env["KNIT_SHARED"], "process");
        assert_eq!(env["KNIT_OVERRIDE"], "config");
        assert_eq!(env["DEBUG"], "true");
        assert!(!env.contains_key("OTHER"));
    }

    #[test]
    #[serial]
    fn missing_env_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = collect_env(dir.path(), Some(".env.missing"), &prefixes(), None).unwrap_err();
        assert!(matches!(err, ConfigError::EnvFile { .. }));
    }
}
