// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Retrieval-augmented question answering over uploaded PDFs
//!
//! `process_documents` builds and persists a fresh index, replacing the
//! previous one. `ask` retrieves the top-k chunks from the current index,
//! stuffs them into the prompt and forwards it to the completion model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::errors::RagError;
use super::prompt::build_prompt;
use crate::chunking::{DocumentSplitter, TextChunk};
use crate::config::{AppConfig, RagConfig, MAX_TOP_K};
use crate::documents::{extract_pdf, is_pdf, DocumentError, PdfDocument};
use crate::embeddings::{create_embedder, Embedder};
use crate::llm::{CompletionModel, GeminiClient};
use crate::vector::{DocumentIndex, DocumentRecord, IndexError};

/// A file received from the UI, API or CLI
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSummary {
    pub documents: Vec<DocumentRecord>,
    pub document_count: usize,
    pub page_count: usize,
    pub chunk_count: usize,
    pub embedding_model: String,
    pub elapsed_ms: u64,
    pub message: String,
}

/// Where a retrieved passage came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub file_name: String,
    pub chunk_index: usize,
    pub page_start: usize,
    pub page_end: usize,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub answer: String,
    pub model: String,
    pub sources: Vec<SourceRef>,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    pub index_ready: bool,
    pub document_count: usize,
    pub chunk_count: usize,
    pub documents: Vec<String>,
    pub indexed_at: Option<DateTime<Utc>>,
    pub api_key_configured: bool,
    pub embedding_model: String,
    pub completion_model: Option<String>,
    pub top_k: usize,
}

pub struct RagPipeline {
    config: RagConfig,
    splitter: DocumentSplitter,
    embedder: Arc<dyn Embedder>,
    completion: Option<Arc<dyn CompletionModel>>,
    /// Current index; questions clone the `Arc` and keep their snapshot
    index: RwLock<Option<Arc<DocumentIndex>>>,
    /// Serializes `process_documents`
    processing: Mutex<()>,
}

impl std::fmt::Debug for RagPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagPipeline")
            .field("config", &self.config)
            .field("splitter", &self.splitter)
            .field("embedding_model", &self.embedder.model_name())
            .field("has_completion_model", &self.completion.is_some())
            .finish_non_exhaustive()
    }
}

impl RagPipeline {
    /// `completion` is `None` when no API key is configured; processing still works
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn Embedder>,
        completion: Option<Arc<dyn CompletionModel>>,
    ) -> Result<Self, RagError> {
        config.validate().map_err(RagError::Config)?;
        let splitter = DocumentSplitter::new(config.chunk_size, config.chunk_overlap)
            .map_err(RagError::Config)?;

        Ok(Self {
            config,
            splitter,
            embedder,
            completion,
            index: RwLock::new(None),
            processing: Mutex::new(()),
        })
    }

    /// Build the configured embedder and, when a key is present, the Gemini client
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let embedder = create_embedder(&config.embedding).await?;

        let completion: Option<Arc<dyn CompletionModel>> = if config.has_api_key() {
            Some(Arc::new(GeminiClient::from_config(&config.gemini)?))
        } else {
            warn!("⚠️  GOOGLE_API_KEY not found; questions will be rejected until it is set");
            None
        };

        Ok(Self::new(config.rag.clone(), embedder, completion)?)
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn index_dir(&self) -> &PathBuf {
        &self.config.index_dir
    }

    /// Snapshot of the current index, if any
    pub async fn current_index(&self) -> Option<Arc<DocumentIndex>> {
        self.index.read().await.clone()
    }

    /// Extract, chunk, embed, index and persist the uploaded PDFs
    ///
    /// Replaces any existing index. On failure the previous index stays active.
    pub async fn process_documents(
        &self,
        files: Vec<UploadedFile>,
    ) -> Result<ProcessSummary, RagError> {
        if files.is_empty() {
            return Err(RagError::NoFiles);
        }
        for file in &files {
            if !is_pdf(&file.file_name, &file.bytes) {
                return Err(DocumentError::NotPdf(file.file_name.clone()).into());
            }
        }

        let _guard = self.processing.lock().await;
        let start = Instant::now();
        info!("📄 Processing {} uploaded file(s)", files.len());

        let extracted = tokio::task::spawn_blocking(move || extract_all(files))
            .await
            .map_err(|e| RagError::Internal(format!("PDF extraction task failed: {}", e)))??;

        let mut chunks: Vec<TextChunk> = Vec::new();
        let mut records = Vec::with_capacity(extracted.len());
        let mut page_count = 0;
        for (document, sha256) in &extracted {
            if document.is_blank() {
                warn!("No text extracted from '{}'", document.file_name);
            }
            let document_chunks = self.splitter.split_document(document);
            debug!(
                "'{}': {} pages, {} chunks",
                document.file_name,
                document.page_count(),
                document_chunks.len()
            );
            page_count += document.page_count();
            records.push(DocumentRecord {
                file_name: document.file_name.clone(),
                sha256: sha256.clone(),
                pages: document.page_count(),
                chunks: document_chunks.len(),
            });
            chunks.extend(document_chunks);
        }

        if chunks.is_empty() {
            return Err(RagError::NoText);
        }

        let chunk_count = chunks.len();
        let index =
            Arc::new(DocumentIndex::from_chunks(chunks, records.clone(), self.embedder.as_ref()).await?);

        let to_save = Arc::clone(&index);
        let dir = self.config.index_dir.clone();
        tokio::task::spawn_blocking(move || to_save.save(&dir))
            .await
            .map_err(|e| RagError::Internal(format!("Index save task failed: {}", e)))??;

        *self.index.write().await = Some(index);

        let document_count = records.len();
        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            "✅ Processed {} PDF(s): {} pages, {} chunks in {}ms",
            document_count, page_count, chunk_count, elapsed_ms
        );

        Ok(ProcessSummary {
            documents: records,
            document_count,
            page_count,
            chunk_count,
            embedding_model: self.embedder.model_name().to_string(),
            elapsed_ms,
            message: format!("Processed {} PDF(s)!", document_count),
        })
    }

    /// Answer a question from the current index
    ///
    /// `top_k` overrides the configured number of retrieved chunks.
    pub async fn ask(&self, question: &str, top_k: Option<usize>) -> Result<Answer, RagError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::EmptyQuestion);
        }

        let index = self.current_index().await.ok_or(RagError::IndexNotReady)?;
        let completion = self.completion.as_ref().ok_or(RagError::MissingApiKey)?;

        let k = top_k.unwrap_or(self.config.top_k);
        if k == 0 || k > MAX_TOP_K {
            return Err(RagError::Config(format!(
                "top_k must be between 1 and {}",
                MAX_TOP_K
            )));
        }

        let start = Instant::now();
        let retrieved = index
            .similarity_search(question, k, self.embedder.as_ref())
            .await?;
        debug!("Retrieved {} chunks for question", retrieved.len());

        let prompt = build_prompt(question, &retrieved);
        let result = completion.complete(&prompt).await?;

        let sources = retrieved
            .iter()
            .map(|r| SourceRef {
                file_name: r.chunk.source.clone(),
                chunk_index: r.chunk.chunk_index,
                page_start: r.chunk.page_start,
                page_end: r.chunk.page_end,
                score: r.score,
            })
            .collect();

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            "🤖 Answered question with {} ({} sources, {}ms)",
            result.model,
            retrieved.len(),
            elapsed_ms
        );

        Ok(Answer {
            answer: result.text,
            model: result.model,
            sources,
            prompt_tokens: result.prompt_tokens,
            completion_tokens: result.completion_tokens,
            elapsed_ms,
        })
    }

    pub async fn status(&self) -> PipelineStatus {
        let index = self.current_index().await;
        let manifest = index.as_ref().map(|i| i.manifest());

        PipelineStatus {
            index_ready: index.is_some(),
            document_count: index.as_ref().map_or(0, |i| i.document_count()),
            chunk_count: index.as_ref().map_or(0, |i| i.chunk_count()),
            documents: manifest
                .map(|m| m.documents.iter().map(|d| d.file_name.clone()).collect())
                .unwrap_or_default(),
            indexed_at: manifest.map(|m| m.created_at),
            api_key_configured: self.completion.is_some(),
            embedding_model: self.embedder.model_name().to_string(),
            completion_model: self.completion.as_ref().map(|c| c.model_name()),
            top_k: self.config.top_k,
        }
    }

    /// Load a previously saved index from the configured directory
    ///
    /// Returns `Ok(false)` when there is nothing to load.
    pub async fn load_existing(&self) -> Result<bool, RagError> {
        let dir = self.config.index_dir.clone();
        if !DocumentIndex::exists(&dir) {
            debug!("No saved index at {}", dir.display());
            return Ok(false);
        }

        let index = tokio::task::spawn_blocking(move || DocumentIndex::load(&dir))
            .await
            .map_err(|e| RagError::Internal(format!("Index load task failed: {}", e)))?
            .map_err(|e| match e {
                IndexError::NotFound(_) => RagError::IndexNotReady,
                other => RagError::Index(other),
            })?;
        index.ensure_compatible(self.embedder.as_ref())?;

        *self.index.write().await = Some(Arc::new(index));
        Ok(true)
    }
}

fn extract_all(files: Vec<UploadedFile>) -> Result<Vec<(PdfDocument, String)>, RagError> {
    files
        .into_iter()
        .map(|file| {
            let sha256 = hex::encode(Sha256::digest(&file.bytes));
            let document = extract_pdf(&file.file_name, &file.bytes)?;
            Ok((document, sha256))
        })
        .collect()
}
