//! Rolldown plugins backing the plan's plugin descriptors.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use knit_config::NodeProtocol;
use rolldown_common::ResolvedExternal;
use rolldown_plugin::{
    HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn, HookTransformArgs,
    HookTransformOutput, HookTransformReturn, HookUsage, Plugin, PluginContext,
    SharedTransformPluginContext,
};

use crate::external::{Decision, ExternalRules, rewrite_builtin};
use crate::import_glob;

/// Externalizes dependencies according to [`ExternalRules`].
#[derive(Debug)]
pub struct ExternalPlugin {
    rules: Arc<ExternalRules>,
}

impl ExternalPlugin {
    pub fn new(rules: ExternalRules) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }
}

impl Plugin for ExternalPlugin {
    fn name(&self) -> Cow<'static, str> {
        "knit:external".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let rules = Arc::clone(&self.rules);
        let specifier = args.specifier.to_string();
        let importer = args.importer.as_ref().map(|importer| importer.to_string());

        async move {
            match rules.decide(&specifier, importer.as_deref()) {
                Decision::External => {
                    tracing::trace!("[external] {specifier}");
                    Ok(Some(HookResolveIdOutput {
                        id: specifier.into(),
                        external: Some(ResolvedExternal::Bool(true)),
                        ..Default::default()
                    }))
                }
                Decision::Reject(message) => anyhow::bail!(message),
                Decision::Inline | Decision::Default => Ok(None),
            }
        }
    }
}

/// Adds or strips the `node:` prefix of builtin imports.
#[derive(Debug)]
pub struct NodeProtocolPlugin {
    mode: NodeProtocol,
}

impl NodeProtocolPlugin {
    pub fn new(mode: NodeProtocol) -> Self {
        Self { mode }
    }
}

impl Plugin for NodeProtocolPlugin {
    fn name(&self) -> Cow<'static, str> {
        "knit:node-protocol".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier.to_string();
        let rewritten = rewrite_builtin(&specifier, self.mode);

        async move {
            Ok(rewritten.map(|id| HookResolveIdOutput {
                id: id.into(),
                external: Some(ResolvedExternal::Bool(true)),
                ..Default::default()
            }))
        }
    }
}

/// Expands `import.meta.glob` calls; see [`import_glob::rewrite`].
#[derive(Debug)]
pub struct ImportGlobPlugin {
    root: Arc<PathBuf>,
}

impl ImportGlobPlugin {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: Arc::new(root),
        }
    }
}

impl Plugin for ImportGlobPlugin {
    fn name(&self) -> Cow<'static, str> {
        "knit:import-glob".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Transform
    }

    fn transform(
        &self,
        _ctx: SharedTransformPluginContext,
        args: &HookTransformArgs<'_>,
    ) -> impl std::future::Future<Output = HookTransformReturn> + Send {
        let id = args.id.to_string();
        let code = args.code.to_string();
        let root = Arc::clone(&self.root);

        async move {
            let rewritten = import_glob::rewrite(&code, Path::new(&id), &root)
                .map_err(|err| anyhow::anyhow!("{id}: {err}"))?;
            Ok(rewritten.map(|code| HookTransformOutput {
                code: Some(code),
                map: None,
                side_effects: None,
                module_type: None,
            }))
        }
    }
}
