//! Writing build output to disk.
//!
//! Every chunk of a pipeline is first written next to its target as a
//! `.tmp` file and only renamed into place once all writes succeeded, so a
//! failed build never leaves half of its outputs behind. File names coming
//! from the engine are validated to stay inside the output directory.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;

use crate::chunk::Chunk;
use crate::error::{BuildError, Result};

/// Write `chunks` under their `out_dir`, creating directories as needed.
pub fn write_chunks(chunks: &[Chunk]) -> Result<()> {
    let mut operations = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let dir = normalize_dir(&chunk.out_dir)?;
        let target = validate_output_path(&dir, &chunk.file_name)?;
        operations.push((target, chunk.source.as_slice()));
    }

    write_files_atomic(&operations)?;
    tracing::debug!("Wrote {} files", operations.len());
    Ok(())
}

fn normalize_dir(dir: &Path) -> Result<PathBuf> {
    let cleaned = dir.clean();
    if cleaned.is_absolute() {
        return Ok(cleaned);
    }
    let cwd = std::env::current_dir().map_err(|e| {
        BuildError::InvalidOutputPath(format!("Failed to get current directory: {e}"))
    })?;
    Ok(cwd.join(cleaned).clean())
}

/// Resolve `file_name` under `base_dir`, rejecting anything that escapes it.
pub(crate) fn validate_output_path(base_dir: &Path, file_name: &str) -> Result<PathBuf> {
    if file_name.contains('\0') {
        return Err(BuildError::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }

    let full_path = base_dir.join(Path::new(file_name).clean()).clean();
    if !full_path.starts_with(base_dir) {
        return Err(BuildError::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            file_name,
            base_dir.display(),
            full_path.display()
        )));
    }

    Ok(full_path)
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_files_atomic(operations: &[(PathBuf, &[u8])]) -> Result<()> {
    let mut temp_files = Vec::new();

    for (target, content) in operations {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup_temp_files(&temp_files);
                BuildError::WriteFailure(format!(
                    "Failed to create directory '{}': {e}",
                    parent.display()
                ))
            })?;
        }

        let temp = temp_path(target);
        fs::write(&temp, content).map_err(|e| {
            cleanup_temp_files(&temp_files);
            BuildError::WriteFailure(format!(
                "Failed to write temporary file '{}': {e}",
                temp.display()
            ))
        })?;
        temp_files.push((temp, target.clone()));
    }

    for (temp, target) in &temp_files {
        fs::rename(temp, target).map_err(|e| {
            cleanup_temp_files(&temp_files);
            BuildError::WriteFailure(format!(
                "Failed to rename '{}' to '{}': {e}",
                temp.display(),
                target.display()
            ))
        })?;
    }

    Ok(())
}

fn cleanup_temp_files(temp_files: &[(PathBuf, PathBuf)]) {
    for (temp, _) in temp_files {
        if temp.exists() {
            if let Err(e) = fs::remove_file(temp) {
                tracing::warn!(
                    "Failed to clean up temporary file '{}': {e}",
                    temp.display()
                );
            }
        }
    }
}
