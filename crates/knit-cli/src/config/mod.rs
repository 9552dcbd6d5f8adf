//! Invocation settings and the translation of build flags into an
//! [`InlineConfig`].
//!
//! A handful of settings may also come from `KNIT_*` environment variables.
//! Priority: CLI > Environment.

mod conversions;

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use knit_config::{ConfigLoader, LogLevel};
use serde::{Deserialize, Serialize};

use crate::cli::BuildArgs;
use crate::error::{CliError, Result};

pub use conversions::inline_config;

/// Environment variables consulted by [`Settings::load`].
const ENV_KEYS: &[&str] = &["log_level", "config_loader", "config", "filter"];

/// Settings that are not part of a build config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_loader: Option<ConfigLoader>,

    /// Explicit config file or directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<PathBuf>,

    /// Comma separated workspace filters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl Settings {
    /// Layer the `KNIT_*` environment under the command line flags.
    pub fn load(args: &BuildArgs) -> Result<Self> {
        Self::figment(args)
            .extract()
            .map_err(|e| CliError::InvalidArgument(e.to_string()))
    }

    fn figment(args: &BuildArgs) -> Figment {
        Figment::new()
            .merge(Env::prefixed("KNIT_").only(ENV_KEYS))
            .merge(Serialized::defaults(Self::from_args(args)))
    }

    fn from_args(args: &BuildArgs) -> Self {
        Self {
            log_level: args.log_level.map(Into::into),
            config_loader: args.config_loader.map(Into::into),
            config: args.config.clone(),
            filter: (!args.filter.is_empty()).then(|| args.filter.join(",")),
        }
    }

    pub fn filters(&self) -> Vec<String> {
        self.filter
            .iter()
            .flat_map(|filter| filter.split(','))
            .map(str::trim)
            .filter(|filter| !filter.is_empty())
            .map(str::to_string)
            .collect()
    }
}
