//! Executable permission for entry chunks with a shebang line.

use crate::chunk::Chunk;
use crate::error::Result;

pub fn has_shebang(chunk: &Chunk) -> bool {
    chunk.source.starts_with(b"#!")
}

/// Mark written entry chunks starting with `#!` as executable (`0o755`).
/// Returns how many files were updated.
pub fn grant_execute(chunks: &[Chunk]) -> Result<usize> {
    let mut granted = 0;
    for chunk in chunks {
        if !chunk.is_chunk() || !chunk.is_entry || !has_shebang(chunk) {
            continue;
        }
        let path = chunk.path();
        if !path.exists() {
            continue;
        }
        tracing::info!("Granting execute permission to {}", path.display());
        set_executable(&path)?;
        granted += 1;
    }
    Ok(granted)
}

#[cfg(unix)]
fn set_executable(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &std::path::Path) -> Result<()> {
    Ok(())
}
