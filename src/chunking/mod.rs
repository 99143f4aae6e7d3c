// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document chunking
//!
//! Wraps the recursive splitter from `text-splitter`: text is split on the
//! largest semantic boundary (paragraph, sentence, word, character) that keeps
//! each chunk within `chunk_size` characters, and consecutive chunks share up
//! to `chunk_overlap` characters.

use serde::{Deserialize, Serialize};
use text_splitter::{Characters, ChunkConfig, TextSplitter};

use crate::documents::PdfDocument;

/// One chunk of a document with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    /// File the chunk came from
    pub source: String,
    /// Position of the chunk within its document
    pub chunk_index: usize,
    /// First page covered (1-based)
    pub page_start: usize,
    /// Last page covered (1-based, inclusive)
    pub page_end: usize,
    pub text: String,
}

pub struct DocumentSplitter {
    splitter: TextSplitter<Characters>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl std::fmt::Debug for DocumentSplitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSplitter")
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .finish_non_exhaustive()
    }
}

impl DocumentSplitter {
    /// Creates a splitter; fails when the overlap is not smaller than the chunk size
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, String> {
        if chunk_size == 0 {
            return Err("Chunk size must be greater than 0".to_string());
        }
        let config = ChunkConfig::new(chunk_size)
            .with_overlap(chunk_overlap)
            .map_err(|e| format!("Invalid chunk configuration: {}", e))?;

        Ok(Self {
            splitter: TextSplitter::new(config),
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split raw text, dropping whitespace-only chunks
    pub fn split(&self, text: &str) -> Vec<String> {
        self.splitter
            .chunks(text)
            .filter(|chunk| !chunk.trim().is_empty())
            .map(String::from)
            .collect()
    }

    /// Split a document's concatenated page text, recording which pages each chunk spans
    pub fn split_document(&self, document: &PdfDocument) -> Vec<TextChunk> {
        let text = document.text();
        let offsets = document.page_offsets();

        self.splitter
            .chunk_indices(&text)
            .filter(|(_, chunk)| !chunk.trim().is_empty())
            .enumerate()
            .map(|(chunk_index, (start, chunk))| {
                let end = start + chunk.len().saturating_sub(1);
                TextChunk {
                    source: document.file_name.clone(),
                    chunk_index,
                    page_start: page_at(&offsets, start),
                    page_end: page_at(&offsets, end),
                    text: chunk.to_string(),
                }
            })
            .collect()
    }
}

/// 1-based page containing the given byte offset
fn page_at(offsets: &[usize], byte: usize) -> usize {
    offsets.partition_point(|&o| o <= byte).max(1)
}
