//! Engine input/output plans derived from a resolved config.

use std::collections::BTreeMap;
use std::path::PathBuf;

use knit_config::entry::lowest_common_ancestor;
use knit_config::{Format, NodeProtocol, Platform, ResolvedConfig, SourcemapMode};

use crate::external::ExternalRules;

/// One named entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryItem {
    pub name: String,
    pub import: PathBuf,
}

/// Engine plugins switched on by config features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginDescriptor {
    NodeProtocol(NodeProtocol),
    External,
    /// Expands `import.meta.glob(...)` calls.
    ImportGlob,
    Dts { sourcemap: bool },
}

#[derive(Debug, Clone)]
pub struct InputPlan {
    pub entries: Vec<EntryItem>,
    pub cwd: PathBuf,
    /// Lowest common ancestor of every entry.
    pub root: PathBuf,
    pub external: ExternalRules,
    pub plugins: Vec<PluginDescriptor>,
    pub alias: BTreeMap<String, String>,
    pub treeshake: bool,
    pub target: Option<Vec<String>>,
    pub platform: Platform,
    pub define: BTreeMap<String, String>,
    pub tsconfig: Option<PathBuf>,
    pub shims: bool,
    pub unbundle: bool,
}

#[derive(Debug, Clone)]
pub struct OutputPlan {
    pub format: Format,
    pub dir: PathBuf,
    /// File name template of entry chunks, e.g. `[name].mjs`.
    pub entry_file_names: String,
    /// File name template of shared chunks, e.g. `[name]-[hash].mjs`.
    pub chunk_file_names: String,
    /// `mjs`, `cjs` or `js`.
    pub extension: &'static str,
    /// Matching declaration extension, e.g. `d.mts`.
    pub dts_extension: &'static str,
    pub sourcemap: SourcemapMode,
    pub minify: bool,
    /// Only declaration files are kept.
    pub dts_only: bool,
    pub global_name: Option<String>,
    pub cjs_default: bool,
}

/// Everything the engine needs for one pass over one config.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub label: String,
    pub input: InputPlan,
    pub output: OutputPlan,
    /// Engine warnings fail the build.
    pub fail_on_warn: bool,
}

impl BuildPlan {
    /// Plan the main pass of `config`, or with `cjs_dts` the
    /// declaration-only pass that gives CommonJS output its `.d.cts` files.
    pub fn new(config: &ResolvedConfig, cjs_dts: bool) -> Self {
        let module_package = config.pkg.as_deref().is_some_and(|pkg| pkg.is_module());
        let extension = js_extension(config.format, module_package, config.fixed_extension);

        let mut plugins = Vec::new();
        if config.node_protocol != NodeProtocol::Preserve {
            plugins.push(PluginDescriptor::NodeProtocol(config.node_protocol));
        }
        if config.pkg.is_some() || config.skip_node_modules_bundle || config.inline_only.is_some() {
            plugins.push(PluginDescriptor::External);
        }
        if config.glob_import && !cjs_dts {
            plugins.push(PluginDescriptor::ImportGlob);
        }
        if let Some(dts) = &config.dts {
            if config.format == Format::Es || cjs_dts {
                plugins.push(PluginDescriptor::Dts {
                    sourcemap: dts.sourcemap.unwrap_or(false),
                });
            }
        }

        let entries: Vec<EntryItem> = config
            .entry
            .iter()
            .map(|(name, import)| EntryItem {
                name: name.clone(),
                import: import.clone(),
            })
            .collect();
        let imports: Vec<PathBuf> = entries.iter().map(|entry| entry.import.clone()).collect();
        let root = match lowest_common_ancestor(&imports) {
            root if root.as_os_str().is_empty() => config.cwd.clone(),
            root => root,
        };

        let platform = if cjs_dts || config.format == Format::Cjs {
            Platform::Node
        } else {
            config.platform
        };

        let input = InputPlan {
            entries,
            cwd: config.cwd.clone(),
            root,
            external: ExternalRules::from_config(config),
            plugins,
            alias: config.alias.clone(),
            treeshake: config.treeshake,
            target: config.target.clone(),
            platform,
            define: define_with_env(&config.define, &config.env),
            tsconfig: config.tsconfig.clone(),
            shims: config.shims,
            unbundle: config.unbundle,
        };

        let chunk_file_names = if config.hash {
            format!("[name]-[hash].{extension}")
        } else {
            format!("[name].{extension}")
        };
        let output = OutputPlan {
            format: if cjs_dts { Format::Es } else { config.format },
            dir: config.out_dir.clone(),
            entry_file_names: format!("[name].{extension}"),
            chunk_file_names,
            extension,
            dts_extension: dts_extension(extension),
            sourcemap: config.sourcemap,
            minify: config.minify && !cjs_dts,
            dts_only: cjs_dts,
            global_name: config.global_name.clone(),
            cjs_default: config.cjs_default,
        };

        let label = if cjs_dts {
            format!("{} (dts)", config.label())
        } else {
            config.label()
        };
        BuildPlan {
            label,
            input,
            output,
            fail_on_warn: config.fail_on_warn,
        }
    }
}

/// JavaScript output extension for `format`. With `fixed_extension` ESM is
/// always `.mjs` and CommonJS `.cjs`; otherwise the package `type` decides.
pub fn js_extension(format: Format, module_package: bool, fixed_extension: bool) -> &'static str {
    match format {
        Format::Es if !fixed_extension && module_package => "js",
        Format::Es => "mjs",
        Format::Cjs if fixed_extension || module_package => "cjs",
        Format::Cjs => "js",
        Format::Iife | Format::Umd => "js",
    }
}

pub fn dts_extension(js_extension: &str) -> &'static str {
    match js_extension {
        "mjs" => "d.mts",
        "cjs" => "d.cts",
        _ => "d.ts",
    }
}

/// `define` plus every collected env variable, inlined as
/// `process.env.KEY` and `import.meta.env.KEY` string literals.
pub fn define_with_env(
    define: &BTreeMap<String, String>,
    env: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = define.clone();
    for (key, value) in env {
        let literal = serde_json::Value::String(value.clone()).to_string();
        merged.insert(format!("process.env.{key}"), literal.clone());
        merged.insert(format!("import.meta.env.{key}"), literal);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_follow_package_type() {
        assert_eq!(js_extension(Format::Es, false, true), "mjs");
        assert_eq!(js_extension(Format::Es, true, false), "js");
        assert_eq!(js_extension(Format::Es, false, false), "mjs");
        assert_eq!(js_extension(Format::Cjs, false, false), "js");
        assert_eq!(js_extension(Format::Cjs, true, false), "cjs");
        assert_eq!(js_extension(Format::Cjs, false, true), "cjs");
        assert_eq!(js_extension(Format::Iife, true, true), "js");

        assert_eq!(dts_extension("mjs"), "d.mts");
        assert_eq!(dts_extension("cjs"), "d.cts");
        assert_eq!(dts_extension("js"), "d.ts");
    }

    #[test]
    fn env_is_inlined_as_string_literals() {
        let define = BTreeMap::from([("__DEV__".to_string(), "false".to_string())]);
        let env = BTreeMap::from([("KNIT_API".to_string(), "https://x".to_string())]);
        let merged = define_with_env(&define, &env);
        assert_eq!(merged["__DEV__"], "false");
        assert_eq!(merged["process.env.KNIT_API"], "\"https://x\"");
        assert_eq!(merged["import.meta.env.KNIT_API"], "\"https://x\"");
    }
}
