//! Output artifacts of a build.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use knit_config::ResolvedConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Code produced from modules.
    Chunk,
    /// Anything else the engine emitted (source maps, css, copied files).
    Asset,
}

/// One output artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Path relative to `out_dir`, always `/`-separated.
    pub file_name: String,
    pub kind: ChunkKind,
    /// Entry name for entry chunks.
    pub name: Option<String>,
    pub is_entry: bool,
    pub facade_module_id: Option<String>,
    pub module_ids: Vec<String>,
    pub imports: Vec<String>,
    pub dynamic_imports: Vec<String>,
    pub source: Vec<u8>,
    /// Set after the build so chunks of different passes merge uniformly.
    pub out_dir: PathBuf,
}

impl Chunk {
    pub fn chunk(file_name: impl Into<String>, source: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            kind: ChunkKind::Chunk,
            name: None,
            is_entry: false,
            facade_module_id: None,
            module_ids: Vec::new(),
            imports: Vec::new(),
            dynamic_imports: Vec::new(),
            source: source.into(),
            out_dir: PathBuf::new(),
        }
    }

    pub fn asset(file_name: impl Into<String>, source: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: ChunkKind::Asset,
            ..Self::chunk(file_name, source)
        }
    }

    /// Mark this chunk as the entry `name`, built from `facade`.
    pub fn with_entry(mut self, name: impl Into<String>, facade: impl Into<String>) -> Self {
        let facade = facade.into();
        self.name = Some(name.into());
        self.is_entry = true;
        self.module_ids.push(facade.clone());
        self.facade_module_id = Some(facade);
        self
    }

    pub fn is_chunk(&self) -> bool {
        self.kind == ChunkKind::Chunk
    }

    /// Declaration files: `.d.ts`, `.d.mts` and `.d.cts`.
    pub fn is_dts(&self) -> bool {
        is_dts_file(&self.file_name)
    }

    /// Absolute path of the written file.
    pub fn path(&self) -> PathBuf {
        self.out_dir.join(&self.file_name)
    }

    pub fn code(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.source)
    }

    pub fn size(&self) -> usize {
        self.source.len()
    }
}

pub fn is_dts_file(file_name: &str) -> bool {
    [".d.ts", ".d.mts", ".d.cts"]
        .iter()
        .any(|suffix| file_name.ends_with(suffix))
}

/// Output of one build pipeline: the config it was built from and every
/// chunk of every pass.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub config: Arc<ResolvedConfig>,
    pub chunks: Vec<Chunk>,
}

impl Bundle {
    pub fn new(config: Arc<ResolvedConfig>, chunks: Vec<Chunk>) -> Self {
        Self { config, chunks }
    }

    pub fn out_dir(&self) -> &Path {
        &self.config.out_dir
    }

    pub fn entries(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter().filter(|chunk| chunk.is_chunk() && chunk.is_entry)
    }
}
