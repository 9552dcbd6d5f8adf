//! Rolldown plugin emitting TypeScript declaration files.
//!
//! Declarations come from OXC's isolated declarations transform, one file per
//! TypeScript module of the bundle. Entry modules are named after their
//! entry chunk; every other module keeps its path relative to the entry root
//! so relative imports between declaration files still resolve.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_isolated_declarations::{IsolatedDeclarations, IsolatedDeclarationsOptions};
use oxc_parser::Parser;
use oxc_span::SourceType as OxcSourceType;
use rolldown_common::{Output, OutputAsset};
use rolldown_plugin::{HookGenerateBundleArgs, HookNoopReturn, HookUsage, Plugin, PluginContext};

use crate::chunk::is_dts_file;

#[derive(Debug, Clone)]
pub struct DtsPlugin {
    /// Directory non-entry declarations are made relative to.
    root: PathBuf,
    /// `d.ts`, `d.mts` or `d.cts`.
    extension: &'static str,
}

impl DtsPlugin {
    pub fn new(root: PathBuf, extension: &'static str) -> Self {
        Self { root, extension }
    }
}

impl Plugin for DtsPlugin {
    fn name(&self) -> Cow<'static, str> {
        "knit:dts".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::GenerateBundle
    }

    fn generate_bundle(
        &self,
        _ctx: &PluginContext,
        args: &mut HookGenerateBundleArgs<'_>,
    ) -> impl std::future::Future<Output = HookNoopReturn> + Send {
        let root = self.root.clone();
        let extension = self.extension;

        async move {
            let mut emitted = HashSet::new();
            let mut assets = Vec::new();

            // Entry facades first so they claim the entry file names.
            let mut modules: Vec<(String, Option<(String, String)>)> = Vec::new();
            for output in args.bundle.iter() {
                let Output::Chunk(chunk) = output else {
                    continue;
                };
                if chunk.is_entry {
                    if let Some(facade) = &chunk.facade_module_id {
                        let stem = strip_js_extension(&chunk.filename);
                        modules.push((
                            facade.as_ref().to_string(),
                            Some((chunk.name.to_string(), format!("{stem}.{extension}"))),
                        ));
                    }
                }
            }
            for output in args.bundle.iter() {
                let Output::Chunk(chunk) = output else {
                    continue;
                };
                for module_id in &chunk.modules.keys {
                    modules.push((module_id.as_ref().to_string(), None));
                }
            }

            for (module_id, entry) in modules {
                if !is_typescript_module(&module_id) || !emitted.insert(module_id.clone()) {
                    continue;
                }

                let source = match std::fs::read_to_string(&module_id) {
                    Ok(source) => source,
                    Err(err) => {
                        tracing::warn!("Failed to read {module_id} for declarations: {err}");
                        continue;
                    }
                };
                let declarations = match generate_dts(&source, &module_id) {
                    Ok(code) => code,
                    Err(err) => {
                        tracing::warn!("Failed to generate declarations for {module_id}: {err}");
                        continue;
                    }
                };

                let (names, filename) = match entry {
                    Some((name, filename)) => (vec![name], filename),
                    None => (Vec::new(), relative_dts_name(&root, &module_id, extension)),
                };
                assets.push(Output::Asset(Arc::new(OutputAsset {
                    names,
                    original_file_names: vec![module_id],
                    filename: filename.into(),
                    source: declarations.into(),
                })));
            }

            args.bundle.extend(assets);
            Ok(())
        }
    }
}

fn is_typescript_module(path: &str) -> bool {
    !is_dts_file(path)
        && Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext, "ts" | "tsx" | "mts" | "cts"))
}

fn strip_js_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(dot) if !file_name[dot..].contains('/') => &file_name[..dot],
        _ => file_name,
    }
}

fn relative_dts_name(root: &Path, module_id: &str, extension: &str) -> String {
    let path = Path::new(module_id);
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    let relative = relative.to_string_lossy().replace('\\', "/");
    format!("{}.{extension}", relative.trim_start_matches('/'))
}

/// Generate declarations for one TypeScript source.
fn generate_dts(source: &str, file_path: &str) -> Result<String> {
    let allocator = Allocator::default();
    let source_type = OxcSourceType::from_path(file_path)
        .with_context(|| format!("Invalid TypeScript file: {file_path}"))?;

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if !parsed.errors.is_empty() {
        let messages: Vec<String> = parsed.errors.iter().map(|e| format!("{e:?}")).collect();
        anyhow::bail!("Failed to parse {file_path}: {}", messages.join(", "));
    }

    let options = IsolatedDeclarationsOptions {
        strip_internal: true,
    };
    let result = IsolatedDeclarations::new(&allocator, options).build(&parsed.program);
    if !result.errors.is_empty() {
        let messages: Vec<String> = result.errors.iter().map(|e| format!("{e:?}")).collect();
        anyhow::bail!("{file_path}: {}", messages.join(", "));
    }

    Ok(Codegen::new().build(&result.program).code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_typescript_sources_get_declarations() {
        assert!(is_typescript_module("/p/src/index.ts"));
        assert!(is_typescript_module("/p/src/view.tsx"));
        assert!(!is_typescript_module("/p/src/types.d.ts"));
        assert!(!is_typescript_module("/p/src/index.js"));
    }

    #[test]
    fn declaration_names() {
        assert_eq!(strip_js_extension("utils/helper.mjs"), "utils/helper");
        assert_eq!(
            relative_dts_name(Path::new("/p/src"), "/p/src/utils/helper.ts", "d.mts"),
            "utils/helper.d.mts"
        );
    }

    #[test]
    fn generates_isolated_declarations() {
        let source = "export function greet(name: string): string { return name }\n";
        let dts = generate_dts(source, "greet.ts").unwrap();
        assert!(dts.contains("export declare function greet(name: string): string;"));
    }
}
