//! `import.meta.glob` expansion.
//!
//! `import.meta.glob('./modules/*.ts')` becomes an object literal mapping
//! every matched file, relative to the importing module, to a lazy
//! `import()`. With `{ eager: true }` the modules are imported statically.
//! Patterns starting with `/` are relative to the project root and `!`
//! patterns exclude.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use knit_config::entry::lowest_common_ancestor;
use knit_config::glob::{self, Kind};
use regex::Regex;

use crate::error::Result;

static GLOB_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"import\.meta\.glob\(\s*(\[[^\]]*\]|'[^']*'|"[^"]*")\s*(?:,\s*(\{[^}]*\})\s*)?,?\s*\)"#,
    )
    .expect("glob call pattern is valid")
});

static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'([^']*)'|"([^"]*)""#).expect("string pattern is valid"));

static EAGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\beager\s*:\s*true\b").expect("eager pattern is valid"));

/// Rewrite the glob imports of the module `id`. `None` when it has none.
pub fn rewrite(code: &str, id: &Path, root: &Path) -> Result<Option<String>> {
    if !code.contains("import.meta.glob") {
        return Ok(None);
    }
    let dir = id.parent().unwrap_or(root);

    let mut imports = String::new();
    let mut body = String::with_capacity(code.len());
    let mut last = 0;
    for (index, call) in GLOB_CALL.captures_iter(code).enumerate() {
        let (Some(whole), Some(list)) = (call.get(0), call.get(1)) else {
            continue;
        };
        let patterns: Vec<&str> = STRING_LITERAL
            .captures_iter(list.as_str())
            .filter_map(|literal| literal.get(1).or_else(|| literal.get(2)))
            .map(|literal| literal.as_str())
            .collect();
        let eager = call
            .get(2)
            .is_some_and(|options| EAGER.is_match(options.as_str()));

        let mut files = expand(&patterns, dir, root)?;
        files.retain(|file| file != id);

        let mut entries = Vec::with_capacity(files.len());
        for (n, file) in files.iter().enumerate() {
            let specifier = quote(&relative_specifier(dir, file));
            if eager {
                let binding = format!("__knit_glob_{index}_{n}");
                imports.push_str(&format!("import * as {binding} from {specifier};\n"));
                entries.push(format!("{specifier}: {binding}"));
            } else {
                entries.push(format!("{specifier}: () => import({specifier})"));
            }
        }

        body.push_str(&code[last..whole.start()]);
        body.push_str(&format!("({{{}}})", entries.join(", ")));
        last = whole.end();
    }

    if last == 0 {
        return Ok(None);
    }
    body.push_str(&code[last..]);
    imports.push_str(&body);
    Ok(Some(imports))
}

/// Files matching `patterns`, sorted.
fn expand(patterns: &[&str], dir: &Path, root: &Path) -> Result<Vec<PathBuf>> {
    let mut anchored = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let (negated, pattern) = match pattern.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, *pattern),
        };
        let (from, pattern) = match pattern.strip_prefix('/') {
            Some(rest) => (root, rest),
            None => (dir, pattern.trim_start_matches("./")),
        };
        let base = glob::glob_base(pattern);
        let rest = pattern[base.len()..].trim_start_matches('/');
        anchored.push((negated, path_clean::clean(from.join(base)), rest));
    }
    if anchored.iter().all(|(negated, ..)| *negated) {
        return Ok(Vec::new());
    }

    let bases: Vec<PathBuf> = anchored.iter().map(|(_, base, _)| base.clone()).collect();
    let search = match bases.as_slice() {
        [single] => single.clone(),
        _ => lowest_common_ancestor(&bases),
    };
    let relative: Vec<String> = anchored
        .iter()
        .map(|(negated, base, rest)| {
            let prefix = slash_path(base.strip_prefix(&search).unwrap_or(base.as_path()));
            let pattern = if prefix.is_empty() {
                rest.to_string()
            } else {
                format!("{prefix}/{rest}")
            };
            if *negated { format!("!{pattern}") } else { pattern }
        })
        .collect();

    if !search.is_dir() {
        return Ok(Vec::new());
    }
    Ok(glob::expand(&search, &relative, Kind::Files)?)
}

/// `./`- or `../`-prefixed import specifier of `file` as seen from `dir`.
fn relative_specifier(dir: &Path, file: &Path) -> String {
    let common = lowest_common_ancestor(&[dir.to_path_buf(), file.to_path_buf()]);
    let ups = dir
        .components()
        .count()
        .saturating_sub(common.components().count());
    let down = slash_path(file.strip_prefix(&common).unwrap_or(file));
    if ups == 0 {
        format!("./{down}")
    } else {
        format!("{}{down}", "../".repeat(ups))
    }
}

fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let root = TempDir::new().unwrap();
        for file in [
            "src/index.ts",
            "src/modules/a.ts",
            "src/modules/b.ts",
            "src/modules/b.test.ts",
        ] {
            write(root.path(), file, "export {}\n");
        }
        root
    }

    #[test]
    fn lazy_imports_by_default() {
        let root = project();
        let id = root.path().join("src/index.ts");
        let code = "const modules = import.meta.glob('./modules/*.ts');\n";

        let out = rewrite(code, &id, root.path()).unwrap().unwrap();
        assert_eq!(
            out,
            "const modules = ({\"./modules/a.ts\": () => import(\"./modules/a.ts\"), \
             \"./modules/b.test.ts\": () => import(\"./modules/b.test.ts\"), \
             \"./modules/b.ts\": () => import(\"./modules/b.ts\")});\n"
        );
    }

    #[test]
    fn eager_imports_with_negation() {
        let root = project();
        let id = root.path().join("src/index.ts");
        let code = r#"export const modules = import.meta.glob(["./modules/*.ts", "!**/*.test.ts"], { eager: true });"#;

        let out = rewrite(code, &id, root.path()).unwrap().unwrap();
        assert!(out.starts_with(
            "import * as __knit_glob_0_0 from \"./modules/a.ts\";\n\
             import * as __knit_glob_0_1 from \"./modules/b.ts\";\n"
        ));
        assert!(out.contains(
            "({\"./modules/a.ts\": __knit_glob_0_0, \"./modules/b.ts\": __knit_glob_0_1})"
        ));
        assert!(!out.contains("b.test"));
    }

    #[test]
    fn root_and_parent_patterns_are_relative_to_the_importer() {
        let root = project();
        let id = root.path().join("src/modules/a.ts");

        let out = rewrite("import.meta.glob('/src/*.ts')", &id, root.path())
            .unwrap()
            .unwrap();
        assert_eq!(out, "({\"../index.ts\": () => import(\"../index.ts\")})");

        let out = rewrite("import.meta.glob('./*.ts')", &id, root.path())
            .unwrap()
            .unwrap();
        assert!(!out.contains("./a.ts"), "{out}");
        assert!(out.contains("\"./b.ts\""), "{out}");
    }

    #[test]
    fn modules_without_glob_imports_are_untouched() {
        let root = project();
        let id = root.path().join("src/index.ts");
        assert!(rewrite("export const a = 1;", &id, root.path()).unwrap().is_none());
        assert!(rewrite("// import.meta.glob is documented here", &id, root.path())
            .unwrap()
            .is_none());
    }
}
