//! Glob expansion relative to a working directory.
//!
//! Patterns prefixed with `!` exclude matches. Results are absolute and
//! sorted so expansion is deterministic.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::{ConfigError, Result};
use crate::filter::path_string;

const SKIPPED_DIRS: &[&str] = &["node_modules", ".git"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Files,
    Dirs,
}

/// Whether the string uses any glob syntax.
pub fn is_dynamic(pattern: &str) -> bool {
    pattern.starts_with('!') || pattern.contains(['*', '?', '[', ']', '{', '}'])
}

/// The static directory prefix of a pattern, e.g. `src/entries` for
/// `src/entries/**/*.ts`.
pub fn glob_base(pattern: &str) -> &str {
    let pattern = pattern.trim_start_matches("./");
    let mut end = 0;
    for (index, segment) in pattern.split('/').enumerate() {
        if is_dynamic(segment) {
            break;
        }
        let offset = if index == 0 { 0 } else { 1 };
        let next = end + offset + segment.len();
        if next >= pattern.len() {
            break;
        }
        end = next;
    }
    &pattern[..end]
}

pub struct Matcher {
    include: GlobSet,
    exclude: GlobSet,
}

impl Matcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            match pattern.strip_prefix('!') {
                Some(negated) => exclude.add(compile(negated)?),
                None => include.add(compile(pattern)?),
            };
        }
        Ok(Self {
            include: build(include)?,
            exclude: build(exclude)?,
        })
    }

    pub fn is_match(&self, relative: &str) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }

    pub fn is_excluded(&self, relative: &str) -> bool {
        self.exclude.is_match(relative)
    }
}

fn compile(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern.trim_start_matches("./"))
        .literal_separator(true)
        .build()
        .map_err(|e| ConfigError::Glob {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

fn build(builder: GlobSetBuilder) -> Result<GlobSet> {
    builder.build().map_err(|e| ConfigError::Glob {
        pattern: String::new(),
        message: e.to_string(),
    })
}

/// Expand `patterns` under `cwd`.
pub fn expand<S: AsRef<str>>(cwd: &Path, patterns: &[S], kind: Kind) -> Result<Vec<PathBuf>> {
    let matcher = Matcher::new(patterns)?;
    let mut matches = Vec::new();

    let walker = WalkDir::new(cwd)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && SKIPPED_DIRS.contains(&entry.file_name().to_string_lossy().as_ref()))
        });

    for entry in walker {
        let entry = entry.map_err(|e| ConfigError::Io(e.into()))?;
        let wanted = match kind {
            Kind::Files => entry.file_type().is_file(),
            Kind::Dirs => entry.file_type().is_dir(),
        };
        if !wanted {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(cwd) else {
            continue;
        };
        if matcher.is_match(&path_string(relative)) {
            matches.push(entry.path().to_path_buf());
        }
    }

    matches.sort();
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn base_stops_at_first_dynamic_segment() {
        assert_eq!(glob_base("src/entries/**/*.ts"), "src/entries");
        assert_eq!(glob_base("./src/*.ts"), "src");
        assert_eq!(glob_base("*.ts"), "");
        assert_eq!(glob_base("src/index.ts"), "src");
    }

    #[test]
    fn expands_files_with_negation() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join("src/a.ts"), "").unwrap();
        fs::write(dir.path().join("src/b.test.ts"), "").unwrap();
        fs::write(dir.path().join("src/nested/c.ts"), "").unwrap();

        let files = expand(dir.path(), &["src/**/*.ts", "!**/*.test.ts"], Kind::Files).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("src/a.ts"), dir.path().join("src/nested/c.ts")]
        );

        let shallow = expand(dir.path(), &["src/*.ts"], Kind::Files).unwrap();
        assert_eq!(shallow.len(), 2);
    }

    #[test]
    fn expands_directories_only() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("packages/a")).unwrap();
        fs::create_dir_all(dir.path().join("packages/b")).unwrap();
        fs::write(dir.path().join("packages/README.md"), "").unwrap();

        let dirs = expand(dir.path(), &["packages/*"], Kind::Dirs).unwrap();
        assert_eq!(
            dirs,
            vec![dir.path().join("packages/a"), dir.path().join("packages/b")]
        );
    }
}
