use std::collections::BTreeMap;
use std::path::PathBuf;

use knit_config::{
    CleanOption, ConfigFileOption, CopyEntry, EntryInput, FeatureOption, Format, InlineConfig,
    OnSuccess, OneOrMany, TargetOption, Toggle, UserConfig, WatchOption, WorkspaceOption,
};
use serde_json::Value;

use super::Settings;
use crate::cli::BuildArgs;

/// Build the inline config of one invocation.
///
/// Boolean flags only ever switch a feature on (or off, for the `--no-*`
/// flags); a flag that was not given leaves the config file value alone.
pub fn inline_config(args: &BuildArgs, settings: &Settings) -> InlineConfig {
    let config = if args.no_config {
        Some(ConfigFileOption::Enabled(false))
    } else {
        settings.config.clone().map(ConfigFileOption::Path)
    };
    let filters = settings.filters();

    InlineConfig {
        user: user_config(args, settings),
        config,
        config_loader: settings.config_loader,
        filter: (!filters.is_empty()).then(|| OneOrMany::Many(filters)),
    }
}

fn user_config(args: &BuildArgs, settings: &Settings) -> UserConfig {
    let clean = if args.clean {
        Some(CleanOption::Enabled(true))
    } else if args.no_clean {
        Some(CleanOption::Enabled(false))
    } else {
        None
    };

    UserConfig {
        entry: non_empty(&args.files).map(EntryInput::List),
        format: non_empty(&args.format)
            .map(|formats| OneOrMany::Many(formats.into_iter().map(Format::from).collect())),
        out_dir: args.out_dir.clone(),
        cwd: args.cwd.clone(),
        name: args.name.clone(),
        clean,
        platform: args.platform.map(Into::into),
        target: non_empty(&args.target).map(|targets| TargetOption::Targets(targets.into())),
        sourcemap: args.sourcemap.map(Into::into),
        minify: flag(args.minify),
        treeshake: args.no_treeshake.then_some(false),
        dts: feature(args.dts),
        exports: feature(args.exports),
        publint: feature(args.publint),
        attw: feature(args.attw),
        report: args.no_report.then(|| FeatureOption::from(false)),
        external: non_empty(&args.external).map(OneOrMany::Many),
        no_external: non_empty(&args.no_external).map(OneOrMany::Many),
        tsconfig: args
            .tsconfig
            .as_ref()
            .map(|path| ConfigFileOption::Path(PathBuf::from(path))),
        unbundle: flag(args.unbundle),
        shims: flag(args.shims),
        global_name: args.global_name.clone(),
        fixed_extension: flag(args.fixed_extension),
        env: (!args.env.is_empty()).then(|| {
            args.env
                .iter()
                .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                .collect::<BTreeMap<_, _>>()
        }),
        env_file: args.env_file.clone(),
        env_prefix: non_empty(&args.env_prefix).map(OneOrMany::Many),
        copy: non_empty(&args.copy)
            .map(|paths| OneOrMany::Many(paths.into_iter().map(CopyEntry::Path).collect())),
        watch: args.watch.as_ref().map(|paths| match non_empty(paths) {
            Some(paths) => WatchOption::Paths(OneOrMany::Many(paths)),
            None => WatchOption::Enabled(true),
        }),
        ignore_watch: non_empty(&args.ignore_watch).map(OneOrMany::Many),
        on_success: args.on_success.clone().map(OnSuccess::Command),
        log_level: settings.log_level,
        fail_on_warn: args.fail_on_warn.then_some(Toggle::Bool(true)),
        workspace: args.workspace.as_ref().map(|glob| {
            if glob.is_empty() {
                WorkspaceOption::Enabled(true)
            } else {
                WorkspaceOption::Include(OneOrMany::One(glob.clone()))
            }
        }),
        ..Default::default()
    }
}

fn flag(set: bool) -> Option<bool> {
    set.then_some(true)
}

fn feature<T>(set: bool) -> Option<FeatureOption<T>> {
    set.then(|| FeatureOption::from(true))
}

fn non_empty<T: Clone>(values: &[T]) -> Option<Vec<T>> {
    (!values.is_empty()).then(|| values.to_vec())
}
