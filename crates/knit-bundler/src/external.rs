//! Which imports stay out of the bundle.
//!
//! Production dependencies of the package and their subpaths are always
//! external. `external` patterns add to that list, `noExternal` forces a
//! module back in, and `inlineOnly` turns bundling of anything from
//! `node_modules` into an explicit allow-list.

use std::path::Path;

use knit_config::{NodeProtocol, Pattern, ResolvedConfig};

use crate::chunk::is_dts_file;

const NODE_PREFIX: &str = "node:";

/// Node.js builtin modules that may be imported without the `node:` prefix.
pub const NODE_BUILTINS: &[&str] = &[
    "assert", "assert/strict", "async_hooks", "buffer", "child_process", "cluster", "console",
    "constants", "crypto", "dgram", "diagnostics_channel", "dns", "dns/promises", "domain",
    "events", "fs", "fs/promises", "http", "http2", "https", "inspector", "inspector/promises",
    "module", "net", "os", "path", "path/posix", "path/win32", "perf_hooks", "process",
    "punycode", "querystring", "readline", "readline/promises", "repl", "stream",
    "stream/consumers", "stream/promises", "stream/web", "string_decoder", "sys", "timers",
    "timers/promises", "tls", "trace_events", "tty", "url", "util", "util/types", "v8", "vm",
    "wasi", "worker_threads", "zlib",
];

/// Whether `id` names a Node.js builtin, with or without the `node:` prefix.
pub fn is_builtin(id: &str) -> bool {
    match id.strip_prefix(NODE_PREFIX) {
        Some(_) => true,
        None => NODE_BUILTINS.contains(&id),
    }
}

/// Rewrite a builtin specifier for the configured `nodeProtocol`. Returns
/// `None` when the specifier stays as written.
pub fn rewrite_builtin(id: &str, mode: NodeProtocol) -> Option<String> {
    match mode {
        NodeProtocol::Preserve => None,
        NodeProtocol::Add if NODE_BUILTINS.contains(&id) => Some(format!("{NODE_PREFIX}{id}")),
        NodeProtocol::Strip => match id.strip_prefix(NODE_PREFIX) {
            // Prefix-only modules such as `node:test` keep their prefix.
            Some(bare) if NODE_BUILTINS.contains(&bare) => Some(bare.to_string()),
            _ => None,
        },
        NodeProtocol::Add => None,
    }
}

fn is_bare(id: &str) -> bool {
    !id.starts_with('.') && !Path::new(id).is_absolute() && !id.starts_with('\0')
}

/// What to do with one import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    External,
    /// Force the module into the bundle.
    Inline,
    /// No opinion; the engine resolves it normally.
    Default,
    /// Bundling this module was not allowed.
    Reject(String),
}

#[derive(Debug, Clone, Default)]
pub struct ExternalRules {
    deps: Vec<String>,
    external: Vec<Pattern>,
    no_external: Vec<Pattern>,
    inline_only: Option<Vec<Pattern>>,
    skip_node_modules_bundle: bool,
    aliases: Vec<String>,
}

impl ExternalRules {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            deps: config
                .pkg
                .as_deref()
                .map(|pkg| pkg.production_deps())
                .unwrap_or_default(),
            external: config.external.clone(),
            no_external: config.no_external.clone(),
            inline_only: config.inline_only.clone(),
            skip_node_modules_bundle: config.skip_node_modules_bundle,
            aliases: config.alias.keys().cloned().collect(),
        }
    }

    pub fn with_deps(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.deps = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    /// Decide for `id` imported from `importer`. Entries (no importer) are
    /// never external.
    pub fn decide(&self, id: &str, importer: Option<&str>) -> Decision {
        let Some(importer) = importer else {
            return Decision::Default;
        };

        if self.no_external.iter().any(|pattern| pattern.matches(id)) {
            return Decision::Inline;
        }
        if self.external.iter().any(|pattern| pattern.matches(id)) {
            return Decision::External;
        }
        if self.is_dependency(id) {
            return Decision::External;
        }

        let bare = is_bare(id) && !is_builtin(id) && !self.is_alias(id);
        if self.skip_node_modules_bundle && bare {
            return Decision::External;
        }

        if let Some(allowed) = &self.inline_only {
            let declaration = is_dts_file(importer);
            if bare && !declaration && !allowed.iter().any(|pattern| pattern.matches(id)) {
                return Decision::Reject(format!(
                    "{id} is located in node_modules but is not included in `inlineOnly` option.\n\
                     To fix this, either add it to `inlineOnly`, declare it as a production or peer \
                     dependency in your package.json, or externalize it manually.\n\
                     Imported by {importer}"
                ));
            }
        }

        Decision::Default
    }

    fn is_dependency(&self, id: &str) -> bool {
        self.deps.iter().any(|dep| {
            id == dep
                || id
                    .strip_prefix(dep.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    fn is_alias(&self, id: &str) -> bool {
        self.aliases.iter().any(|alias| {
            id == alias
                || id
                    .strip_prefix(alias.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ExternalRules {
        ExternalRules::default().with_deps(["react", "@scope/pkg"])
    }

    #[test]
    fn dependencies_and_subpaths_are_external() {
        let rules = rules();
        assert_eq!(rules.decide("react", Some("/p/src/a.ts")), Decision::External);
        assert_eq!(rules.decide("react/jsx-runtime", Some("/p/src/a.ts")), Decision::External);
        assert_eq!(rules.decide("@scope/pkg/sub", Some("/p/src/a.ts")), Decision::External);
        assert_eq!(rules.decide("react-dom", Some("/p/src/a.ts")), Decision::Default);
    }

    #[test]
    fn entries_are_never_external() {
        assert_eq!(rules().decide("react", None), Decision::Default);
    }

    #[test]
    fn no_external_wins_over_dependencies() {
        let rules = ExternalRules {
            no_external: vec![Pattern::parse("/^react/").unwrap()],
            ..rules()
        };
        assert_eq!(rules.decide("react", Some("/p/a.ts")), Decision::Inline);
    }

    #[test]
    fn skip_node_modules_bundle_externalizes_bare_imports() {
        let rules = ExternalRules {
            skip_node_modules_bundle: true,
            aliases: vec!["@".into()],
            ..Default::default()
        };
        assert_eq!(rules.decide("lodash", Some("/p/a.ts")), Decision::External);
        assert_eq!(rules.decide("./local", Some("/p/a.ts")), Decision::Default);
        assert_eq!(rules.decide("@/utils", Some("/p/a.ts")), Decision::Default);
        assert_eq!(rules.decide("fs", Some("/p/a.ts")), Decision::Default);
    }

    #[test]
    fn inline_only_rejects_unlisted_bare_imports() {
        let rules = ExternalRules {
            inline_only: Some(vec![Pattern::parse("tiny").unwrap()]),
            ..Default::default()
        };
        assert_eq!(rules.decide("tiny", Some("/p/a.ts")), Decision::Default);
        assert_eq!(rules.decide("node:fs", Some("/p/a.ts")), Decision::Default);
        assert_eq!(rules.decide("huge", Some("/p/a.d.ts")), Decision::Default);
        assert!(matches!(
            rules.decide("huge", Some("/p/a.ts")),
            Decision::Reject(message) if message.contains("inlineOnly")
        ));
    }

    #[test]
    fn node_protocol_rewrites() {
        assert_eq!(rewrite_builtin("fs", NodeProtocol::Add).as_deref(), Some("node:fs"));
        assert_eq!(rewrite_builtin("node:fs", NodeProtocol::Add), None);
        assert_eq!(
            rewrite_builtin("node:fs/promises", NodeProtocol::Strip).as_deref(),
            Some("fs/promises")
        );
        assert_eq!(rewrite_builtin("node:test", NodeProtocol::Strip), None);
        assert_eq!(rewrite_builtin("fs", NodeProtocol::Preserve), None);
        assert!(is_builtin("node:sqlite"));
        assert!(!is_builtin("lodash"));
    }
}
