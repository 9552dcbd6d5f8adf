//! Compilation target resolution.

use semver::{Comparator, Op, Version, VersionReq};

use crate::package::PackageJson;
use crate::types::{OneOrMany, TargetOption};

/// Resolve `target` to a flat list, deriving `node<min>` from
/// `engines.node` when unset. `None` means "engine default".
pub fn resolve_target(target: Option<&TargetOption>, pkg: Option<&PackageJson>) -> Option<Vec<String>> {
    let targets = match target {
        Some(TargetOption::Enabled(false)) => return None,
        Some(TargetOption::Targets(targets)) => targets.to_vec(),
        None | Some(TargetOption::Enabled(true)) => vec![package_target(pkg?)?],
    };
    let flat: Vec<String> = targets
        .iter()
        .flat_map(|target| target.split(','))
        .map(str::trim)
        .filter(|target| !target.is_empty())
        .map(str::to_string)
        .collect();
    (!flat.is_empty()).then_some(flat)
}

/// `node<min-version>` for the package's `engines.node` range.
pub fn package_target(pkg: &PackageJson) -> Option<String> {
    let range = pkg.engines_node()?;
    let version = min_version(range)?;
    if version == Version::new(0, 0, 0) {
        return None;
    }
    Some(format!("node{version}"))
}

/// Lowest version satisfying an npm-style range such as `>=18 || ^16.14`.
pub fn min_version(range: &str) -> Option<Version> {
    range
        .split("||")
        .filter_map(|alternative| min_of_alternative(alternative.trim()))
        .min()
}

fn min_of_alternative(alternative: &str) -> Option<Version> {
    let req = parse_alternative(alternative)?;
    let mut candidate = Version::new(0, 0, 0);
    for comparator in &req.comparators {
        let lower = lower_bound(comparator);
        if let Some(lower) = lower
            && lower > candidate
        {
            candidate = lower;
        }
    }
    req.matches(&candidate).then_some(candidate)
}

fn parse_alternative(alternative: &str) -> Option<VersionReq> {
    if alternative.is_empty() || alternative == "*" || alternative == "x" {
        return Some(VersionReq::STAR);
    }
    // npm separates AND-ed comparators with spaces, semver with commas.
    let normalized = alternative
        .split_whitespace()
        .fold(Vec::<String>::new(), |mut parts, token| {
            match parts.last_mut() {
                Some(last) if last.chars().all(|c| "<>=~^".contains(c)) => last.push_str(token),
                _ => parts.push(token.to_string()),
            }
            parts
        })
        .join(", ");
    VersionReq::parse(&normalized).ok()
}

fn lower_bound(comparator: &Comparator) -> Option<Version> {
    let version = Version::new(
        comparator.major,
        comparator.minor.unwrap_or(0),
        comparator.patch.unwrap_or(0),
    );
    match comparator.op {
        Op::Exact | Op::GreaterEq | Op::Tilde | Op::Caret | Op::Wildcard => Some(version),
        Op::Greater => Some(match (comparator.minor, comparator.patch) {
            (None, _) => Version::new(comparator.major + 1, 0, 0),
            (Some(minor), None) => Version::new(comparator.major, minor + 1, 0),
            (Some(minor), Some(patch)) => Version::new(comparator.major, minor, patch + 1),
        }),
        _ => None,
    }
}

impl From<&str> for TargetOption {
    fn from(value: &str) -> Self {
        TargetOption::Targets(OneOrMany::One(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pkg(engines: &str) -> PackageJson {
        PackageJson::from_value("/p/package.json", json!({ "engines": { "node": engines } }))
            .unwrap()
    }

    #[test]
    fn min_version_of_common_ranges() {
        assert_eq!(min_version(">=18"), Some(Version::new(18, 0, 0)));
        assert_eq!(min_version("^16.14.0 || >=18"), Some(Version::new(16, 14, 0)));
        assert_eq!(min_version(">= 20.6.0"), Some(Version::new(20, 6, 0)));
        assert_eq!(min_version(">16"), Some(Version::new(17, 0, 0)));
    }

    #[test]
    fn derives_target_from_engines() {
        assert_eq!(
            resolve_target(None, Some(&pkg(">=20.19.0"))),
            Some(vec!["node20.19.0".to_string()])
        );
        assert_eq!(resolve_target(None, Some(&pkg("*"))), None);
        assert_eq!(resolve_target(None, None), None);
    }

    #[test]
    fn splits_comma_lists_and_honours_false() {
        let target = TargetOption::from("es2020, chrome100");
        assert_eq!(
            resolve_target(Some(&target), None),
            Some(vec!["es2020".to_string(), "chrome100".to_string()])
        );
        assert_eq!(
            resolve_target(Some(&TargetOption::Enabled(false)), Some(&pkg(">=18"))),
            None
        );
    }
}
