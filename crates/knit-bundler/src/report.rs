//! Size report of a finished pipeline.

use std::path::Path;

use knit_config::ResolvedConfig;

use crate::chunk::Chunk;

/// One reported file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeLine {
    pub file_name: String,
    pub dts: bool,
    pub is_entry: bool,
    pub size: usize,
}

/// Human readable size, e.g. `1.50 KB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

/// Lines in report order: entries first, declarations last, larger files
/// before smaller ones.
pub fn size_lines(chunks: &[Chunk], entries_only: bool) -> Vec<SizeLine> {
    let mut lines: Vec<SizeLine> = chunks
        .iter()
        .map(|chunk| SizeLine {
            file_name: chunk.file_name.clone(),
            dts: chunk.is_dts(),
            is_entry: chunk.is_chunk() && chunk.is_entry,
            size: chunk.size(),
        })
        .filter(|line| !entries_only || line.is_entry)
        .collect();

    lines.sort_by(|a, b| {
        a.dts
            .cmp(&b.dts)
            .then_with(|| b.is_entry.cmp(&a.is_entry))
            .then_with(|| b.size.cmp(&a.size))
    });
    lines
}

/// Log the report of `chunks` built for `config`.
pub fn report(config: &ResolvedConfig, chunks: &[Chunk]) {
    let Some(options) = &config.report else {
        return;
    };

    let lines = size_lines(chunks, options.entries_only);
    if lines.is_empty() {
        return;
    }

    let out_dir = relative_out_dir(&config.cwd, &config.out_dir);
    let label = config.label();
    let width = lines.iter().map(|line| line.file_name.len()).max().unwrap_or(0);
    let total: usize = lines.iter().map(|line| line.size).sum();

    for line in &lines {
        tracing::info!(
            "{label} {out_dir}/{:<width$}  {}",
            line.file_name,
            format_size(line.size as u64)
        );
    }
    tracing::info!("{label} {} files, total: {}", lines.len(), format_size(total as u64));
}

fn relative_out_dir(cwd: &Path, out_dir: &Path) -> String {
    out_dir
        .strip_prefix(cwd)
        .unwrap_or(out_dir)
        .to_string_lossy()
        .replace('\\', "/")
}
