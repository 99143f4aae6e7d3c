// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document index: chunks, their embeddings and the HNSW graph over them
//!
//! On-disk layout of an index directory:
//!
//! ```text
//! <index_dir>/
//!   manifest.json   IndexManifest (serde_json)
//!   chunks.bin      Vec<StoredChunk> (bincode)
//! ```
//!
//! The HNSW graph is not persisted; it is rebuilt from the stored vectors on load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::hnsw::HnswIndex;
use crate::chunking::TextChunk;
use crate::embeddings::Embedder;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const CHUNKS_FILE: &str = "chunks.bin";
pub const FORMAT_VERSION: u32 = 1;

/// Errors from building, searching or persisting a [`DocumentIndex`]
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("No index found at {0}")]
    NotFound(String),

    #[error("Index at {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Index was built with embedding model '{expected}', active model is '{actual}'")]
    ModelMismatch { expected: String, actual: String },

    #[error("Dimension mismatch: index has {expected}D vectors, embedder produces {actual}D")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Failed to build index: {0}")]
    Build(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One uploaded document as recorded in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub file_name: String,
    /// Hex SHA-256 of the uploaded bytes
    pub sha256: String,
    pub pages: usize,
    pub chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding_model: String,
    pub dimensions: usize,
    pub chunk_count: usize,
    pub documents: Vec<DocumentRecord>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChunk {
    chunk: TextChunk,
    vector: Vec<f32>,
}

/// A chunk returned by similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: TextChunk,
    pub score: f32,
}

pub struct DocumentIndex {
    manifest: IndexManifest,
    chunks: Vec<TextChunk>,
    vectors: Vec<Vec<f32>>,
    hnsw: HnswIndex,
}

impl std::fmt::Debug for DocumentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentIndex")
            .field("manifest", &self.manifest)
            .field("hnsw", &self.hnsw)
            .finish_non_exhaustive()
    }
}

impl DocumentIndex {
    /// Embed every chunk and build the index
    pub async fn from_chunks(
        chunks: Vec<TextChunk>,
        documents: Vec<DocumentRecord>,
        embedder: &dyn Embedder,
    ) -> Result<Self, IndexError> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| IndexError::Embedding(e.to_string()))?;

        if vectors.len() != chunks.len() {
            return Err(IndexError::Embedding(format!(
                "Embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            embedding_model: embedder.model_name().to_string(),
            dimensions: embedder.dimension(),
            chunk_count: chunks.len(),
            documents,
            created_at: Utc::now(),
        };

        Self::assemble(manifest, chunks, vectors)
    }

    fn assemble(
        manifest: IndexManifest,
        chunks: Vec<TextChunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self, IndexError> {
        let hnsw = HnswIndex::build(&vectors, manifest.dimensions)
            .map_err(|e| IndexError::Build(e.to_string()))?;
        debug!(
            "Built HNSW index: {} vectors, {} dimensions",
            hnsw.len(),
            hnsw.dimensions()
        );

        Ok(Self {
            manifest,
            chunks,
            vectors,
            hnsw,
        })
    }

    /// The `k` chunks most similar to `query`, highest score first
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<RetrievedChunk>, IndexError> {
        self.ensure_compatible(embedder)?;

        let query_vector = embedder
            .embed(query)
            .await
            .map_err(|e| IndexError::Embedding(e.to_string()))?;

        let hits = self
            .hnsw
            .search(&query_vector, k, f32::MIN)
            .map_err(|e| IndexError::Search(e.to_string()))?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                self.chunks.get(hit.id).map(|chunk| RetrievedChunk {
                    chunk: chunk.clone(),
                    score: hit.score,
                })
            })
            .collect())
    }

    /// Fails when the index was built with a different embedding model or dimension
    pub fn ensure_compatible(&self, embedder: &dyn Embedder) -> Result<(), IndexError> {
        if self.manifest.dimensions != embedder.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: self.manifest.dimensions,
                actual: embedder.dimension(),
            });
        }
        if self.manifest.embedding_model != embedder.model_name() {
            return Err(IndexError::ModelMismatch {
                expected: self.manifest.embedding_model.clone(),
                actual: embedder.model_name().to_string(),
            });
        }
        Ok(())
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn document_count(&self) -> usize {
        self.manifest.documents.len()
    }

    /// Whether `dir` holds a saved index
    pub fn exists(dir: &Path) -> bool {
        dir.join(MANIFEST_FILE).is_file() && dir.join(CHUNKS_FILE).is_file()
    }

    /// Persist to `dir`, replacing any previous index there
    ///
    /// Files are written to a sibling staging directory which is then renamed
    /// into place, so readers never observe a half-written index.
    pub fn save(&self, dir: &Path) -> Result<(), IndexError> {
        let staging = sibling(dir, "staging");
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let mut manifest_writer = BufWriter::new(File::create(staging.join(MANIFEST_FILE))?);
        serde_json::to_writer_pretty(&mut manifest_writer, &self.manifest).map_err(|e| {
            IndexError::Corrupt {
                path: staging.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        manifest_writer.flush()?;

        let stored: Vec<StoredChunk> = self
            .chunks
            .iter()
            .zip(&self.vectors)
            .map(|(chunk, vector)| StoredChunk {
                chunk: chunk.clone(),
                vector: vector.clone(),
            })
            .collect();
        let mut writer = BufWriter::new(File::create(staging.join(CHUNKS_FILE))?);
        bincode::serialize_into(&mut writer, &stored).map_err(|e| IndexError::Corrupt {
            path: staging.display().to_string(),
            reason: e.to_string(),
        })?;
        writer.flush()?;

        let retired = sibling(dir, "retired");
        if dir.exists() {
            if retired.exists() {
                fs::remove_dir_all(&retired)?;
            }
            fs::rename(dir, &retired)?;
        }
        fs::rename(&staging, dir)?;
        if retired.exists() {
            if let Err(e) = fs::remove_dir_all(&retired) {
                warn!("Could not remove old index at {}: {}", retired.display(), e);
            }
        }

        info!(
            "💾 Saved index to {} ({} chunks, {} documents)",
            dir.display(),
            self.chunk_count(),
            self.document_count()
        );
        Ok(())
    }

    /// Load an index saved by [`DocumentIndex::save`] and rebuild its HNSW graph
    pub fn load(dir: &Path) -> Result<Self, IndexError> {
        if !Self::exists(dir) {
            return Err(IndexError::NotFound(dir.display().to_string()));
        }
        let corrupt = |reason: String| IndexError::Corrupt {
            path: dir.display().to_string(),
            reason,
        };

        let manifest: IndexManifest =
            serde_json::from_reader(BufReader::new(File::open(dir.join(MANIFEST_FILE))?))
                .map_err(|e| corrupt(format!("manifest: {}", e)))?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {}",
                manifest.format_version
            )));
        }

        let stored: Vec<StoredChunk> =
            bincode::deserialize_from(BufReader::new(File::open(dir.join(CHUNKS_FILE))?))
                .map_err(|e| corrupt(format!("chunks: {}", e)))?;
        if stored.len() != manifest.chunk_count {
            return Err(corrupt(format!(
                "manifest lists {} chunks, found {}",
                manifest.chunk_count,
                stored.len()
            )));
        }

        let (chunks, vectors): (Vec<TextChunk>, Vec<Vec<f32>>) =
            stored.into_iter().map(|s| (s.chunk, s.vector)).unzip();

        let index = Self::assemble(manifest, chunks, vectors)?;
        info!(
            "📂 Loaded index from {} ({} chunks, model {})",
            dir.display(),
            index.chunk_count(),
            index.manifest.embedding_model
        );
        Ok(index)
    }
}

/// `<parent>/.<name>.<suffix>` next to `dir`
fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    let file_name = format!(".{}.{}", name, suffix);
    match dir.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}
