//! String-or-regex patterns and the package filters built on them.

use std::fmt;
use std::path::Path;

use regex::Regex;

use crate::error::{ConfigError, Result};
use crate::types::OneOrMany;

/// A matcher written either as a plain string or as `/regex/`.
#[derive(Debug, Clone)]
pub enum Pattern {
    Exact(String),
    Regex(Regex),
}

impl Pattern {
    /// Parse `/.../` as a regular expression, anything else as a literal.
    pub fn parse(raw: &str) -> Result<Self> {
        match regex_source(raw) {
            Some(source) => Regex::new(source)
                .map(Pattern::Regex)
                .map_err(|source| ConfigError::Regex {
                    pattern: raw.to_string(),
                    source,
                }),
            None => Ok(Pattern::Exact(raw.to_string())),
        }
    }

    pub fn parse_all(raw: &[String]) -> Result<Vec<Self>> {
        raw.iter().map(|item| Pattern::parse(item)).collect()
    }

    /// Literal equality or regex search.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Pattern::Exact(exact) => exact == value,
            Pattern::Regex(regex) => regex.is_match(value),
        }
    }

    /// Like [`Pattern::matches`], but literals also match by substring.
    pub fn contained_in(&self, value: &str) -> bool {
        match self {
            Pattern::Exact(exact) => value.contains(exact.as_str()),
            Pattern::Regex(regex) => regex.is_match(value),
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Pattern::Exact(a), Pattern::Exact(b)) => a == b,
            (Pattern::Regex(a), Pattern::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Exact(exact) => f.write_str(exact),
            Pattern::Regex(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

fn regex_source(raw: &str) -> Option<&str> {
    raw.strip_prefix('/')
        .and_then(|rest| rest.strip_suffix('/'))
        .filter(|source| !source.is_empty())
}

/// Keeps or drops resolved configs by package name or relative working
/// directory.
///
/// A single `/regex/` is tested against the name and the relative path; a
/// list of plain strings must match one of them exactly.
#[derive(Debug, Clone)]
pub enum ConfigFilter {
    Regex(Regex),
    Names(Vec<String>),
}

impl ConfigFilter {
    pub fn new(filter: &OneOrMany<String>) -> Result<Self> {
        if let OneOrMany::One(raw) = filter
            && let Pattern::Regex(regex) = Pattern::parse(raw)?
        {
            return Ok(ConfigFilter::Regex(regex));
        }
        Ok(ConfigFilter::Names(filter.to_vec()))
    }

    /// `relative_cwd` is relative to the invocation directory, `.` for the root.
    pub fn accepts(&self, name: Option<&str>, relative_cwd: &str) -> bool {
        match self {
            ConfigFilter::Regex(regex) => {
                name.is_some_and(|name| regex.is_match(name)) || regex.is_match(relative_cwd)
            }
            ConfigFilter::Names(names) => names
                .iter()
                .any(|candidate| Some(candidate.as_str()) == name || candidate == relative_cwd),
        }
    }
}

/// Narrows discovered workspace package directories.
pub fn filter_packages(
    packages: Vec<std::path::PathBuf>,
    filter: &OneOrMany<String>,
) -> Result<Vec<std::path::PathBuf>> {
    let patterns = Pattern::parse_all(&filter.to_vec())?;
    Ok(packages
        .into_iter()
        .filter(|dir| {
            let path = path_string(dir);
            patterns.iter().any(|pattern| pattern.contained_in(&path))
        })
        .collect())
}

pub(crate) fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn slashes_make_a_regex() {
        assert!(matches!(Pattern::parse("/^@scope\\//").unwrap(), Pattern::Regex(_)));
        assert!(matches!(Pattern::parse("lodash").unwrap(), Pattern::Exact(_)));
        assert!(matches!(Pattern::parse("/").unwrap(), Pattern::Exact(_)));
    }

    #[test]
    fn invalid_regex_is_reported() {
        let err = Pattern::parse("/(unclosed/").unwrap_err();
        assert!(matches!(err, ConfigError::Regex { .. }));
    }

    #[test]
    fn config_filter_regex_checks_name_and_path() {
        let filter = ConfigFilter::new(&OneOrMany::One("/^pkg-a$/".to_string())).unwrap();
        assert!(filter.accepts(Some("pkg-a"), "packages/a"));
        assert!(!filter.accepts(Some("pkg-b"), "packages/b"));

        let by_path = ConfigFilter::new(&OneOrMany::One("/packages\\/b/".to_string())).unwrap();
        assert!(by_path.accepts(None, "packages/b"));
    }

    #[test]
    fn config_filter_list_is_exact() {
        let filter = ConfigFilter::new(&OneOrMany::Many(vec![
            "pkg-a".to_string(),
            ".".to_string(),
        ]))
        .unwrap();
        assert!(filter.accepts(Some("pkg-a"), "packages/a"));
        assert!(filter.accepts(Some("root"), "."));
        assert!(!filter.accepts(Some("pkg-ab"), "packages/ab"));
    }

    #[test]
    fn workspace_filter_matches_substrings() {
        let packages = vec![
            PathBuf::from("/repo/packages/core"),
            PathBuf::from("/repo/packages/cli"),
            PathBuf::from("/repo/apps/web"),
        ];
        let kept = filter_packages(packages, &OneOrMany::One("packages".to_string())).unwrap();
        assert_eq!(kept.len(), 2);
    }
}
