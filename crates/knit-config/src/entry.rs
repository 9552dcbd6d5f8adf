//! Entry point resolution.
//!
//! Turns the user's `entry` (a path, a list of paths and globs, or a map of
//! output names) into an ordered map from output name to absolute source path.

use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{ConfigError, Result};
use crate::filter::path_string;
use crate::glob::{self, Kind};
use crate::types::{EntryInput, OneOrMany};

/// Lookup order for entries written without an extension.
pub const ENTRY_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs", "json",
];

pub const DEFAULT_ENTRY: &str = "src/index.ts";

pub type EntryMap = IndexMap<String, PathBuf>;

pub fn resolve_entry(entry: Option<&EntryInput>, cwd: &Path) -> Result<EntryMap> {
    let entry = match entry {
        Some(entry) if !is_empty(entry) => entry,
        _ => {
            let default = cwd.join(DEFAULT_ENTRY);
            if !default.is_file() {
                return Err(ConfigError::NoEntry);
            }
            return Ok(IndexMap::from([("index".to_string(), default)]));
        }
    };

    let map = match entry {
        EntryInput::Single(path) => from_list(std::slice::from_ref(path), cwd)?,
        EntryInput::List(paths) => from_list(paths, cwd)?,
        EntryInput::Map(map) => from_map(map, cwd)?,
    };

    if map.is_empty() {
        let shown = serde_json::to_string(entry).unwrap_or_default();
        return Err(ConfigError::EntryNotFound(shown));
    }
    Ok(map)
}

fn is_empty(entry: &EntryInput) -> bool {
    match entry {
        EntryInput::Single(path) => path.is_empty(),
        EntryInput::List(paths) => paths.is_empty(),
        EntryInput::Map(map) => map.is_empty(),
    }
}

fn from_list(paths: &[String], cwd: &Path) -> Result<EntryMap> {
    let (patterns, literals): (Vec<&String>, Vec<&String>) =
        paths.iter().partition(|path| glob::is_dynamic(path));

    let mut files = literals
        .iter()
        .map(|path| find_entry_file(cwd, path))
        .collect::<Result<Vec<_>>>()?;
    if patterns.iter().any(|pattern| !pattern.starts_with('!')) {
        for file in glob::expand(cwd, &patterns, Kind::Files)? {
            if !files.contains(&file) {
                files.push(file);
            }
        }
    }

    let base = lowest_common_ancestor(&files);
    let stems: Vec<String> = files
        .iter()
        .map(|file| strip_extension(&relative_to(file, &base)))
        .collect();

    let mut map = EntryMap::new();
    for (file, stem) in files.iter().zip(&stems) {
        let conflict = files
            .iter()
            .zip(&stems)
            .any(|(other, other_stem)| other != file && other_stem == stem && !is_css(other));
        let name = if is_css(file) && conflict {
            format!("{stem}.css")
        } else {
            stem.clone()
        };
        map.insert(name, file.clone());
    }
    Ok(map)
}

fn from_map(map: &IndexMap<String, OneOrMany<String>>, cwd: &Path) -> Result<EntryMap> {
    let mut entries = EntryMap::new();
    for (key, value) in map {
        if !key.contains('*') {
            let OneOrMany::One(path) = value else {
                return Err(ConfigError::EntryNotGlob { key: key.clone() });
            };
            entries.insert(key.clone(), find_entry_file(cwd, path)?);
            continue;
        }

        let patterns = value.to_vec();
        let positive: Vec<&String> = patterns.iter().filter(|p| !p.starts_with('!')).collect();
        if positive.len() != 1 {
            return Err(ConfigError::EntryPatternCount {
                key: key.clone(),
                count: positive.len(),
            });
        }
        let base = cwd.join(glob::glob_base(positive[0]));
        for file in glob::expand(cwd, &patterns, Kind::Files)? {
            let stem = strip_extension(&relative_to(&file, &base));
            entries.insert(key.replace('*', &stem), file);
        }
    }
    Ok(entries)
}

/// Resolve a literal entry path, trying each known extension when the path
/// does not exist as written.
pub fn find_entry_file(cwd: &Path, entry: &str) -> Result<PathBuf> {
    let path = path_clean::clean(cwd.join(entry));
    if path.is_file() {
        return Ok(path);
    }
    for ext in ENTRY_EXTENSIONS {
        let mut candidate = path.clone().into_os_string();
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    if path.is_dir() {
        for ext in ENTRY_EXTENSIONS {
            let candidate = path.join(format!("index.{ext}"));
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }
    Err(ConfigError::EntryNotFound(entry.to_string()))
}

/// Deepest directory containing every path. A single path yields its parent.
pub fn lowest_common_ancestor(paths: &[PathBuf]) -> PathBuf {
    match paths {
        [] => PathBuf::new(),
        [single] => single.parent().map(Path::to_path_buf).unwrap_or_default(),
        [first, rest @ ..] => {
            let mut common: Vec<Component<'_>> = first.components().collect();
            for path in rest {
                let shared = common
                    .iter()
                    .zip(path.components())
                    .take_while(|(a, b)| **a == *b)
                    .count();
                common.truncate(shared);
            }
            common.iter().collect()
        }
    }
}

fn relative_to(path: &Path, base: &Path) -> String {
    path_string(path.strip_prefix(base).unwrap_or(path))
}

fn strip_extension(relative: &str) -> String {
    let file_start = relative.rfind('/').map_or(0, |i| i + 1);
    match relative[file_start..].rfind('.') {
        Some(dot) if dot > 0 => relative[..file_start + dot].to_string(),
        _ => relative.to_string(),
    }
}

fn is_css(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("css"))
}
