//! Merging of user configs from several sources.
//!
//! Later sources win per top-level field: arrays and scalars are replaced
//! wholesale, objects are replaced too unless the field merges per entry
//! (`env`, `alias`, `define`).

use std::collections::BTreeMap;

use crate::types::UserConfig;

macro_rules! override_fields {
    ($base:ident, $over:ident; $($field:ident),* $(,)?) => {
        $(
            if $over.$field.is_some() {
                $base.$field = $over.$field;
            }
        )*
    };
}

macro_rules! merge_maps {
    ($base:ident, $over:ident; $($field:ident),* $(,)?) => {
        $(
            $base.$field = merge_map($base.$field.take(), $over.$field);
        )*
    };
}

fn merge_map<V>(
    base: Option<BTreeMap<String, V>>,
    over: Option<BTreeMap<String, V>>,
) -> Option<BTreeMap<String, V>> {
    match (base, over) {
        (Some(mut base), Some(over)) => {
            base.extend(over);
            Some(base)
        }
        (base, None) => base,
        (None, over) => over,
    }
}

impl UserConfig {
    /// Layer `over` on top of `self`.
    pub fn merge(mut self, over: UserConfig) -> UserConfig {
        merge_maps!(self, over; env, alias, define);

        override_fields!(self, over;
            entry,
            external,
            no_external,
            inline_only,
            skip_node_modules_bundle,
            tsconfig,
            platform,
            target,
            env_file,
            env_prefix,
            shims,
            treeshake,
            remove_node_protocol,
            node_protocol,
            format,
            global_name,
            out_dir,
            sourcemap,
            clean,
            minify,
            unbundle,
            bundle,
            fixed_extension,
            hash,
            cjs_default,
            cwd,
            name,
            silent,
            log_level,
            fail_on_warn,
            watch,
            ignore_watch,
            on_success,
            dts,
            publint,
            attw,
            report,
            glob_import,
            exports,
            public_dir,
            copy,
            workspace,
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Format, OneOrMany};
    use serde_json::json;

    fn config(value: serde_json::Value) -> UserConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn later_scalars_win() {
        let merged = config(json!({ "outDir": "dist", "minify": false }))
            .merge(config(json!({ "minify": true })));
        assert_eq!(merged.out_dir.as_deref(), Some("dist"));
        assert_eq!(merged.minify, Some(true));
    }

    #[test]
    fn arrays_are_replaced() {
        let merged = config(json!({ "format": ["es", "cjs"] }))
            .merge(config(json!({ "format": "iife" })));
        assert_eq!(merged.format, Some(OneOrMany::One(Format::Iife)));
    }

    #[test]
    fn env_merges_per_key() {
        let merged = config(json!({ "env": { "A": "1", "B": "2" } }))
            .merge(config(json!({ "env": { "B": "3" } })));
        let env = merged.env.unwrap();
        assert_eq!(env["A"], json!("1"));
        assert_eq!(env["B"], json!("3"));
    }

    #[test]
    fn unset_fields_do_not_clobber() {
        let merged = config(json!({ "name": "root", "platform": "browser" }))
            .merge(UserConfig::default());
        assert_eq!(merged.name.as_deref(), Some("root"));
        assert!(merged.platform.is_some());
    }
}
