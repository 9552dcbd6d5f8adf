//! Feature toggles and CI detection.

use std::env;

use crate::types::{FeatureOption, FeatureOptions, Toggle};

const CI_VARS: &[&str] = &[
    "CI",
    "CONTINUOUS_INTEGRATION",
    "BUILD_NUMBER",
    "RUN_ID",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "BUILDKITE",
];

/// Detect a CI environment from well-known variables. `CI=false` or `CI=0`
/// opts out explicitly.
pub fn is_in_ci() -> bool {
    if let Ok(value) = env::var("CI")
        && (value == "false" || value == "0")
    {
        return false;
    }
    CI_VARS.iter().any(|var| env::var_os(var).is_some())
}

/// Resolve a feature to its options, or `None` when disabled.
///
/// An options object is enabled unless its own `enabled` says otherwise; a
/// bare toggle enables the feature with default options.
pub fn resolve_feature_option<T: FeatureOptions>(
    value: Option<&FeatureOption<T>>,
    default: Toggle,
    in_ci: bool,
) -> Option<T> {
    match value {
        None => default.resolve(in_ci).then(T::default),
        Some(FeatureOption::Toggle(toggle)) => toggle.resolve(in_ci).then(T::default),
        Some(FeatureOption::Options(options)) => {
            let enabled = options.enabled().unwrap_or(Toggle::Bool(true));
            enabled.resolve(in_ci).then(|| options.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CiOption, PublintOptions, ReportOptions};
    use serial_test::serial;

    #[test]
    fn missing_value_uses_default_toggle() {
        let on: Option<ReportOptions> = resolve_feature_option(None, Toggle::Bool(true), false);
        assert_eq!(on, Some(ReportOptions::default()));

        let off: Option<ReportOptions> = resolve_feature_option(None, Toggle::Bool(false), false);
        assert!(off.is_none());
    }

    #[test]
    fn options_object_respects_enabled() {
        let options = FeatureOption::Options(PublintOptions {
            enabled: Some(Toggle::Ci(CiOption::CiOnly)),
            strict: Some(true),
            ..Default::default()
        });
        assert!(resolve_feature_option(Some(&options), Toggle::Bool(false), false).is_none());

        let resolved = resolve_feature_option(Some(&options), Toggle::Bool(false), true).unwrap();
        assert_eq!(resolved.strict, Some(true));
    }

    #[test]
    fn options_object_defaults_to_enabled() {
        let options = FeatureOption::Options(PublintOptions::default());
        assert!(resolve_feature_option(Some(&options), Toggle::Bool(false), false).is_some());
    }

    #[test]
    #[serial]
    fn ci_false_opts_out() {
        let previous = env::var_os("CI");
        // SAFETY: serialized with every other test touching the environment.
        unsafe { env::set_var("CI", "false") };
        assert!(!is_in_ci());
        unsafe {
            match previous {
                Some(value) => env::set_var("CI", value),
                None => env::remove_var("CI"),
            }
        }
    }
}
