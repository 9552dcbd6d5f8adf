//! `package.json` export map generation.
//!
//! Entry chunks of the `es` and `cjs` builds of one package become the
//! `exports` field plus `main`, `module` and `types`. The manifest is
//! rewritten in place keeping its key order, indentation and trailing
//! newline, and only when something changed.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use knit_config::{DevExports, ExportsOptions, Format, PackageJson};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::chunk::Chunk;
use crate::error::Result;

/// Export targets of one subpath.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct SubExport {
    es: Option<String>,
    cjs: Option<String>,
    src: Option<String>,
}

/// Fields generated for the manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedExports {
    pub main: Option<String>,
    pub module: Option<String>,
    pub types: Option<String>,
    pub exports: Map<String, Value>,
    /// Dist exports for `publishConfig` when `devExports` points the
    /// regular exports at sources.
    pub publish_exports: Option<Map<String, Value>>,
}

/// Build the export map from the chunks of every format of one package.
pub fn generate_exports(
    pkg: &PackageJson,
    chunks: &[(Format, &[Chunk])],
    options: &ExportsOptions,
) -> GeneratedExports {
    let pkg_root = pkg.dir();

    let mut main = None;
    let mut module = None;
    let mut cjs_types = None;
    let mut esm_types = None;
    let mut subpaths: IndexMap<String, SubExport> = IndexMap::new();

    for (format, format_chunks) in chunks {
        if !matches!(format, Format::Es | Format::Cjs) {
            continue;
        }

        let entries: Vec<&Chunk> = format_chunks
            .iter()
            .filter(|chunk| chunk.is_chunk() && chunk.is_entry)
            .collect();
        let only_one_entry = entries.iter().filter(|chunk| !chunk.is_dts()).count() == 1;

        for chunk in entries {
            let file_name = slash(&chunk.file_name);
            let mut name = strip_extension(&file_name).to_string();
            let is_dts = name.ends_with(".d");
            if is_dts {
                name.truncate(name.len() - 2);
            }

            let dist_file = dist_path(pkg_root, &chunk.out_dir, &file_name);
            let key = if only_one_entry || name == "index" {
                match (format, is_dts) {
                    (Format::Cjs, true) => cjs_types = Some(dist_file.clone()),
                    (Format::Cjs, false) => main = Some(dist_file.clone()),
                    (_, true) => esm_types = Some(dist_file.clone()),
                    (_, false) => module = Some(dist_file.clone()),
                }
                ".".to_string()
            } else if let Some(dir) = name.strip_suffix("/index") {
                format!("./{dir}")
            } else {
                format!("./{name}")
            };

            let sub_export = subpaths.entry(key).or_default();
            if is_dts {
                continue;
            }
            match format {
                Format::Cjs => sub_export.cjs = Some(dist_file),
                _ => sub_export.es = Some(dist_file),
            }
            if sub_export.src.is_none() {
                if let Some(facade) = &chunk.facade_module_id {
                    sub_export.src = Some(source_path(pkg_root, Path::new(facade)));
                }
            }
        }
    }

    subpaths.sort_by(|a, _, b, _| compare_subpaths(a, b));

    let exports = build_exports(&subpaths, options.dev_exports.as_ref(), options.all);
    let publish_exports = match &options.dev_exports {
        Some(DevExports::Enabled(false)) | None => None,
        Some(_) => Some(build_exports(&subpaths, None, options.all)),
    };

    GeneratedExports {
        main: main.or_else(|| module.clone()).or_else(|| pkg.main().map(String::from)),
        module: module.or_else(|| pkg.module().map(String::from)),
        types: cjs_types
            .or(esm_types)
            .or_else(|| pkg.types().map(String::from)),
        exports,
        publish_exports,
    }
}

fn build_exports(
    subpaths: &IndexMap<String, SubExport>,
    dev_exports: Option<&DevExports>,
    all: bool,
) -> Map<String, Value> {
    let mut exports: Map<String, Value> = subpaths
        .iter()
        .map(|(name, sub_export)| (name.clone(), sub_export_value(dev_exports, sub_export)))
        .collect();

    if all {
        exports.insert("./*".into(), "./*".into());
    } else {
        exports.insert("./package.json".into(), "./package.json".into());
    }
    exports
}

fn sub_export_value(dev_exports: Option<&DevExports>, sub_export: &SubExport) -> Value {
    let SubExport { es, cjs, src } = sub_export;
    let condition = match dev_exports {
        Some(DevExports::Enabled(true)) => {
            return src.clone().map(Value::String).unwrap_or(Value::Null);
        }
        Some(DevExports::Condition(condition)) => Some(condition),
        Some(DevExports::Enabled(false)) | None => None,
    };

    let dual = es.is_some() && cjs.is_some();
    if !dual && condition.is_none() {
        return cjs
            .clone()
            .or_else(|| es.clone())
            .map(Value::String)
            .unwrap_or(Value::Null);
    }

    let mut value = Map::new();
    if let Some(condition) = condition {
        value.insert(
            condition.clone(),
            src.clone().map(Value::String).unwrap_or(Value::Null),
        );
    }
    if let Some(es) = es {
        value.insert(if dual { "import" } else { "default" }.into(), es.clone().into());
    }
    if let Some(cjs) = cjs {
        value.insert(if dual { "require" } else { "default" }.into(), cjs.clone().into());
    }
    Value::Object(value)
}

/// `.` first, then a case-insensitive order with byte order as tie breaker.
fn compare_subpaths(a: &str, b: &str) -> Ordering {
    match (a == ".", b == ".") {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a
            .to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b)),
    }
}

fn strip_extension(file_name: &str) -> &str {
    let base_start = file_name.rfind('/').map_or(0, |slash| slash + 1);
    match file_name[base_start..].rfind('.') {
        Some(dot) if dot > 0 => &file_name[..base_start + dot],
        _ => file_name,
    }
}

fn slash(path: &str) -> String {
    path.replace('\\', "/")
}

fn relative(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<_> = from.components().collect();
    let to: Vec<_> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut relative = PathBuf::new();
    for _ in common..from.len() {
        relative.push("..");
    }
    for component in &to[common..] {
        relative.push(component);
    }
    relative
}

fn dist_path(pkg_root: &Path, out_dir: &Path, file_name: &str) -> String {
    let out_dir = slash(&relative(pkg_root, out_dir).to_string_lossy());
    if out_dir.is_empty() {
        format!("./{file_name}")
    } else if out_dir.starts_with("..") {
        format!("{out_dir}/{file_name}")
    } else {
        format!("./{out_dir}/{file_name}")
    }
}

fn source_path(pkg_root: &Path, facade: &Path) -> String {
    format!("./{}", slash(&relative(pkg_root, facade).to_string_lossy()))
}

/// Indentation of the first indented line, defaulting to two spaces.
pub fn detect_indentation(contents: &str) -> String {
    contents
        .lines()
        .find_map(|line| {
            let trimmed = line.trim_start();
            let indent = &line[..line.len() - trimmed.len()];
            (!indent.is_empty() && !trimmed.is_empty()).then_some(indent)
        })
        .map(|indent| {
            if indent.starts_with('\t') {
                "\t".to_string()
            } else {
                " ".repeat(indent.len())
            }
        })
        .unwrap_or_else(|| "  ".to_string())
}

/// Apply `generated` to the manifest at `path`. Returns whether the file
/// was rewritten.
pub fn write_exports(path: &Path, generated: &GeneratedExports) -> Result<bool> {
    let original = std::fs::read_to_string(path)?;
    let mut manifest: Map<String, Value> = serde_json::from_str(&original)?;

    for (key, value) in [
        ("main", &generated.main),
        ("module", &generated.module),
        ("types", &generated.types),
    ] {
        if let Some(value) = value {
            manifest.insert(key.to_string(), Value::String(value.clone()));
        }
    }
    manifest.insert("exports".into(), Value::Object(generated.exports.clone()));

    if let Some(publish_exports) = &generated.publish_exports {
        let publish_config = manifest
            .entry("publishConfig")
            .or_insert_with(|| Value::Object(Map::new()));
        if !publish_config.is_object() {
            *publish_config = Value::Object(Map::new());
        }
        if let Value::Object(publish_config) = publish_config {
            publish_config.insert("exports".into(), Value::Object(publish_exports.clone()));
        }
    }

    let mut contents = to_string_with_indent(&manifest, &detect_indentation(&original))?;
    if original.ends_with('\n') {
        contents.push('\n');
    }
    if contents == original {
        tracing::debug!("Exports of {} are up to date", path.display());
        return Ok(false);
    }

    std::fs::write(path, contents)?;
    tracing::debug!("Wrote exports to {}", path.display());
    Ok(true)
}

pub fn to_string_with_indent(value: &impl Serialize, indent: &str) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn pkg(dir: &Path, value: Value) -> PackageJson {
        PackageJson::from_value(dir.join("package.json"), value).unwrap()
    }

    fn entry(file_name: &str, name: &str, facade: &str, out_dir: &Path) -> Chunk {
        let mut chunk = Chunk::chunk(file_name, "").with_entry(name, facade);
        chunk.out_dir = out_dir.to_path_buf();
        chunk
    }

    #[test]
    fn dual_format_package() {
        let root = Path::new("/p");
        let dist = root.join("dist");
        let pkg = pkg(root, json!({ "name": "p" }));
        let es = vec![
            entry("index.mjs", "index", "/p/src/index.ts", &dist),
            entry("index.d.mts", "index.d", "/p/src/index.ts", &dist),
            entry("utils/index.mjs", "utils/index", "/p/src/utils/index.ts", &dist),
        ];
        let cjs = vec![
            entry("index.cjs", "index", "/p/src/index.ts", &dist),
            entry("utils/index.cjs", "utils/index", "/p/src/utils/index.ts", &dist),
        ];

        let generated = generate_exports(
            &pkg,
            &[(Format::Es, &es), (Format::Cjs, &cjs)],
            &ExportsOptions::default(),
        );

        assert_eq!(generated.main.as_deref(), Some("./dist/index.cjs"));
        assert_eq!(generated.module.as_deref(), Some("./dist/index.mjs"));
        assert_eq!(generated.types.as_deref(), Some("./dist/index.d.mts"));
        assert_eq!(
            Value::Object(generated.exports),
            json!({
                ".": { "import": "./dist/index.mjs", "require": "./dist/index.cjs" },
                "./utils": { "import": "./dist/utils/index.mjs", "require": "./dist/utils/index.cjs" },
                "./package.json": "./package.json",
            })
        );
        assert!(generated.publish_exports.is_none());
    }

    #[test]
    fn single_entry_maps_to_root() {
        let root = Path::new("/p");
        let pkg = pkg(root, json!({ "main": "./old.js" }));
        let es = vec![entry("main.mjs", "main", "/p/src/main.ts", &root.join("dist"))];

        let generated = generate_exports(&pkg, &[(Format::Es, &es)], &ExportsOptions::default());
        assert_eq!(generated.main.as_deref(), Some("./dist/main.mjs"));
        assert_eq!(generated.exports["."], json!("./dist/main.mjs"));
    }

    #[test]
    fn dev_exports_point_at_sources() {
        let root = Path::new("/p");
        let pkg = pkg(root, json!({}));
        let dist = root.join("dist");
        let es = vec![
            entry("index.mjs", "index", "/p/src/index.ts", &dist),
            entry("cli.mjs", "cli", "/p/src/cli.ts", &dist),
        ];
        let options = ExportsOptions {
            dev_exports: Some(DevExports::Enabled(true)),
            all: true,
            ..Default::default()
        };

        let generated = generate_exports(&pkg, &[(Format::Es, &es)], &options);
        assert_eq!(
            Value::Object(generated.exports),
            json!({ ".": "./src/index.ts", "./cli": "./src/cli.ts", "./*": "./*" })
        );
        assert_eq!(
            generated.publish_exports.map(Value::Object),
            Some(json!({ ".": "./dist/index.mjs", "./cli": "./dist/cli.mjs", "./*": "./*" }))
        );
    }

    #[test]
    fn custom_dev_condition() {
        let root = Path::new("/p");
        let pkg = pkg(root, json!({}));
        let es = vec![entry("index.mjs", "index", "/p/src/index.ts", &root.join("dist"))];
        let options = ExportsOptions {
            dev_exports: Some(DevExports::Condition("dev".into())),
            ..Default::default()
        };

        let generated = generate_exports(&pkg, &[(Format::Es, &es)], &options);
        assert_eq!(
            generated.exports["."],
            json!({ "dev": "./src/index.ts", "default": "./dist/index.mjs" })
        );
    }

    #[test]
    fn subpaths_sort_case_insensitively_after_root() {
        let mut names = vec!["./b", "./A", ".", "./a"];
        names.sort_by(|a, b| compare_subpaths(a, b));
        assert_eq!(names, vec![".", "./A", "./a", "./b"]);
    }

    #[test]
    fn indentation_detection() {
        assert_eq!(detect_indentation("{\n    \"a\": 1\n}"), "    ");
        assert_eq!(detect_indentation("{\n\t\"a\": 1\n}"), "\t");
        assert_eq!(detect_indentation("{}"), "  ");
    }

    #[test]
    fn unchanged_manifest_is_left_byte_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package.json");
        let original = "{\n  \"name\": \"p\",\n  \"main\": \"./dist/index.js\",\n  \"exports\": {\n    \".\": \"./dist/index.js\",\n    \"./package.json\": \"./package.json\"\n  }\n}";
        std::fs::write(&path, original).unwrap();

        let mut exports = Map::new();
        exports.insert(".".into(), "./dist/index.js".into());
        exports.insert("./package.json".into(), "./package.json".into());
        let generated = GeneratedExports {
            main: Some("./dist/index.js".into()),
            module: None,
            types: None,
            exports,
            publish_exports: None,
        };

        assert!(!write_exports(&path, &generated).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn rewrite_keeps_key_order_and_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, "{\n    \"name\": \"p\",\n    \"main\": \"old.js\",\n    \"version\": \"1.0.0\"\n}\n").unwrap();

        let mut exports = Map::new();
        exports.insert(".".into(), "./dist/index.js".into());
        let generated = GeneratedExports {
            main: Some("./dist/index.js".into()),
            module: None,
            types: None,
            exports: exports.clone(),
            publish_exports: Some(exports),
        };

        assert!(write_exports(&path, &generated).unwrap());
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "{\n    \"name\": \"p\",\n    \"main\": \"./dist/index.js\",\n    \"version\": \"1.0.0\",\n    \"exports\": {\n        \".\": \"./dist/index.js\"\n    },\n    \"publishConfig\": {\n        \"exports\": {\n            \".\": \"./dist/index.js\"\n        }\n    }\n}\n"
        );
    }
}
