//! [`Engine`] implementation on top of rolldown.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use knit_config::{Format, Platform, SourcemapMode};
use rolldown::{
    BundlerBuilder as RolldownBundlerBuilder, BundlerOptions, InputItem, IsExternal, OutputFormat,
    RawMinifyOptions, ResolveOptions, SourceMapType,
};
use rolldown_common::{Output, OutputExports, StrOrBytes};
use rolldown_plugin::__inner::SharedPluginable;

use super::plugins::{ExternalPlugin, ImportGlobPlugin, NodeProtocolPlugin};
use super::{Engine, report_warnings};
use crate::chunk::{Chunk, is_dts_file};
use crate::error::{BuildError, Result};
use crate::plan::{BuildPlan, PluginDescriptor};

/// Bundles with rolldown. Stateless; every build gets a fresh bundler.
#[derive(Debug, Default, Clone)]
pub struct RolldownEngine;

impl RolldownEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Engine for RolldownEngine {
    async fn build(&self, plan: &BuildPlan) -> Result<Vec<Chunk>> {
        let options = bundler_options(plan);
        let plugins = plugins(plan);

        tracing::debug!(
            "[{}] bundling {} entries with {} plugins",
            plan.label,
            plan.input.entries.len(),
            plugins.len()
        );

        let mut bundler = RolldownBundlerBuilder::default()
            .with_options(options)
            .with_plugins(plugins)
            .build()
            .map_err(|e| BuildError::engine(&plan.label, format!("{e:?}")))?;

        let output = bundler
            .generate()
            .await
            .map_err(|e| BuildError::engine(&plan.label, format!("{e:?}")))?;

        report_warnings(plan, &output.warnings)?;

        let mut chunks: Vec<Chunk> = output.assets.iter().map(convert_output).collect();
        if plan.output.dts_only {
            chunks.retain(Chunk::is_dts);
        }
        Ok(chunks)
    }
}

fn bundler_options(plan: &BuildPlan) -> BundlerOptions {
    let input = &plan.input;
    let output = &plan.output;

    let entries = input
        .entries
        .iter()
        .map(|entry| InputItem {
            name: Some(entry.name.clone()),
            import: entry.import.to_string_lossy().into_owned(),
        })
        .collect();

    let format = match output.format {
        Format::Es => OutputFormat::Esm,
        Format::Cjs => OutputFormat::Cjs,
        Format::Iife => OutputFormat::Iife,
        Format::Umd => OutputFormat::Umd,
    };

    let sourcemap = match output.sourcemap {
        SourcemapMode::Off => None,
        SourcemapMode::File => Some(SourceMapType::File),
        SourcemapMode::Inline => Some(SourceMapType::Inline),
        SourcemapMode::Hidden => Some(SourceMapType::Hidden),
    };

    let platform = match input.platform {
        Platform::Node => rolldown::Platform::Node,
        Platform::Browser => rolldown::Platform::Browser,
        Platform::Neutral => rolldown::Platform::Neutral,
    };

    let exports = if output.cjs_default {
        OutputExports::Auto
    } else {
        OutputExports::Named
    };

    BundlerOptions {
        input: Some(entries),
        cwd: Some(input.cwd.clone()),
        dir: Some(output.dir.to_string_lossy().into_owned()),
        format: Some(format),
        sourcemap,
        minify: Some(RawMinifyOptions::Bool(output.minify)),
        platform: Some(platform),
        name: output.global_name.clone(),
        entry_filenames: Some(output.entry_file_names.clone().into()),
        chunk_filenames: Some(output.chunk_file_names.clone().into()),
        exports: Some(exports),
        // Dependencies are externalized by the external plugin, never by pattern.
        external: Some(IsExternal::from(Vec::<String>::new())),
        define: (!input.define.is_empty()).then(|| {
            input
                .define
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        }),
        resolve: Some(configure_resolution(plan)),
        ..Default::default()
    }
}

fn configure_resolution(plan: &BuildPlan) -> ResolveOptions {
    let input = &plan.input;

    let mut modules = Vec::new();
    let mut current = Some(input.cwd.as_path());
    while let Some(dir) = current {
        modules.push(dir.join("node_modules").to_string_lossy().into_owned());
        current = dir.parent();
    }
    modules.push("node_modules".to_string());

    let alias = (!input.alias.is_empty()).then(|| {
        input
            .alias
            .iter()
            .map(|(from, to)| (from.clone(), vec![Some(absolute_alias(&input.cwd, to))]))
            .collect()
    });

    let (main_fields, condition_names) = match input.platform {
        Platform::Node => (vec!["module", "main"], vec!["import", "require", "node", "default"]),
        Platform::Browser => (
            vec!["browser", "module", "main"],
            vec!["import", "require", "browser", "default"],
        ),
        Platform::Neutral => (vec!["module", "main"], vec!["import", "require", "default"]),
    };

    ResolveOptions {
        alias,
        main_fields: Some(main_fields.into_iter().map(String::from).collect()),
        condition_names: Some(condition_names.into_iter().map(String::from).collect()),
        extensions: Some(
            [".ts", ".tsx", ".mts", ".cts", ".js", ".jsx", ".mjs", ".cjs", ".json"]
                .into_iter()
                .map(String::from)
                .collect(),
        ),
        modules: Some(modules),
        symlinks: Some(true),
        tsconfig_filename: input
            .tsconfig
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned()),
        ..Default::default()
    }
}

/// Relative alias targets (`./src`) resolve against the config's cwd; bare
/// package targets stay as written.
fn absolute_alias(cwd: &Path, target: &str) -> String {
    if target.starts_with('.') {
        path_clean::clean(cwd.join(target)).to_string_lossy().into_owned()
    } else {
        target.to_string()
    }
}

fn plugins(plan: &BuildPlan) -> Vec<SharedPluginable> {
    let mut plugins: Vec<SharedPluginable> = Vec::new();
    for descriptor in &plan.input.plugins {
        match descriptor {
            PluginDescriptor::NodeProtocol(mode) => {
                plugins.push(Arc::new(NodeProtocolPlugin::new(*mode)));
            }
            PluginDescriptor::External => {
                plugins.push(Arc::new(ExternalPlugin::new(plan.input.external.clone())));
            }
            PluginDescriptor::ImportGlob => {
                plugins.push(Arc::new(ImportGlobPlugin::new(plan.input.cwd.clone())));
            }
            PluginDescriptor::Dts { sourcemap } => {
                if *sourcemap {
                    tracing::debug!("[{}] declaration maps are not emitted", plan.label);
                }
                dts_plugin(plan, &mut plugins);
            }
        }
    }
    plugins
}

#[cfg(feature = "dts-generation")]
fn dts_plugin(plan: &BuildPlan, plugins: &mut Vec<SharedPluginable>) {
    plugins.push(Arc::new(super::dts::DtsPlugin::new(
        plan.input.root.clone(),
        plan.output.dts_extension,
    )));
}

#[cfg(not(feature = "dts-generation"))]
fn dts_plugin(plan: &BuildPlan, _plugins: &mut Vec<SharedPluginable>) {
    tracing::warn!(
        "[{}] `dts` is enabled but knit was compiled without the `dts-generation` feature",
        plan.label
    );
}

fn convert_output(output: &Output) -> Chunk {
    match output {
        Output::Chunk(chunk) => {
            let mut converted = Chunk::chunk(chunk.filename.to_string(), chunk.code.as_bytes());
            converted.is_entry = chunk.is_entry;
            converted.name = chunk.is_entry.then(|| chunk.name.to_string());
            converted.facade_module_id = chunk.facade_module_id.as_ref().map(|id| id.to_string());
            converted.module_ids = chunk.module_ids.iter().map(|id| id.to_string()).collect();
            converted.imports = chunk.imports.iter().map(|id| id.to_string()).collect();
            converted.dynamic_imports =
                chunk.dynamic_imports.iter().map(|id| id.to_string()).collect();
            converted
        }
        Output::Asset(asset) => {
            let source = match &asset.source {
                StrOrBytes::Str(text) => text.as_bytes().to_vec(),
                StrOrBytes::Bytes(bytes) => bytes.clone(),
            };
            let file_name = asset.filename.to_string();
            // Declarations of entry modules carry their entry name.
            match (asset.names.first(), asset.original_file_names.first()) {
                (Some(name), Some(facade)) if is_dts_file(&file_name) => {
                    Chunk::chunk(file_name, source).with_entry(format!("{name}.d"), facade.clone())
                }
                _ => Chunk::asset(file_name, source),
            }
        }
    }
}
