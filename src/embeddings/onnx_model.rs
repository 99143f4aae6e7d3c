// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX embedding model (all-MiniLM-L6-v2)
//!
//! Runs the sentence transformer through ONNX Runtime:
//! - CUDA execution provider when available, CPU otherwise
//! - BERT tokenization truncated to the model's 256 token window
//! - attention-masked mean pooling over token embeddings
//! - 384-dimensional output vectors

use anyhow::{Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, ArrayViewD, Axis};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{Encoding, Tokenizer, TruncationParams};
use tracing::{debug, info, warn};

use super::Embedder;

const HIDDEN_DIM: usize = 384;
const MAX_SEQUENCE_LENGTH: usize = 256;
/// Texts per inference call
const BATCH_SIZE: usize = 16;

/// ONNX-based embedding model
///
/// Cloning is cheap; the session and tokenizer are shared behind `Arc`.
#[derive(Clone)]
pub struct OnnxEmbeddingModel {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    dimension: usize,
}

impl std::fmt::Debug for OnnxEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingModel")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbeddingModel {
    /// Loads the model and tokenizer from disk and validates the output shape
    ///
    /// # Errors
    /// Returns error if:
    /// - Model or tokenizer file not found or invalid
    /// - ONNX Runtime initialization fails
    /// - Model doesn't output 384 dimensions
    pub async fn new<P: AsRef<Path>>(
        model_name: impl Into<String>,
        model_path: P,
        tokenizer_path: P,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        let session = build_session(model_path)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;
        tokenizer.with_padding(None);

        let model = Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            dimension: HIDDEN_DIM,
        };

        // Validation inference catches models with a different hidden size
        let probe = model.run_batch(vec!["validation test".to_string()])?;
        if probe.first().map(Vec::len) != Some(HIDDEN_DIM) {
            anyhow::bail!(
                "Model outputs unexpected dimensions (expected {})",
                HIDDEN_DIM
            );
        }

        info!("✅ ONNX embedding model '{}' loaded", model.model_name);
        Ok(model)
    }

    /// Tokenize, pad and run one batch through the session
    fn run_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let encodings: Vec<Encoding> = self
            .tokenizer
            .encode_batch(texts, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let batch = encodings.len();
        let max_len = encodings
            .iter()
            .map(|enc| enc.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids = Array2::<i64>::zeros((batch, max_len));
        let mut attention_mask = Array2::<i64>::zeros((batch, max_len));
        let token_type_ids = Array2::<i64>::zeros((batch, max_len));

        for (row, encoding) in encodings.iter().enumerate() {
            for (col, (&id, &mask)) in encoding
                .get_ids()
                .iter()
                .zip(encoding.get_attention_mask())
                .enumerate()
            {
                input_ids[[row, col]] = id as i64;
                attention_mask[[row, col]] = mask as i64;
            }
        }

        let mask_for_pooling = attention_mask.clone();

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("ONNX session lock poisoned"))?;
        let outputs = session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids)?,
            "attention_mask" => Value::from_array(attention_mask)?,
            "token_type_ids" => Value::from_array(token_type_ids)?
        ])?;

        // Index [0]: output names differ between exports
        let token_embeddings = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        mean_pool(token_embeddings, &mask_for_pooling)
    }
}

/// Create a session, trying CUDA first and falling back to CPU
fn build_session(model_path: &Path) -> Result<Session> {
    let cuda_result = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .context("Failed to set CUDA execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(4)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path);

    match cuda_result {
        Ok(session) => {
            info!("ONNX embedding session using CUDA execution provider");
            Ok(session)
        }
        Err(e) => {
            warn!("CUDA execution provider unavailable ({}), using CPU", e);
            Session::builder()
                .context("Failed to create session builder")?
                .with_execution_providers([CPUExecutionProvider::default().build()])
                .context("Failed to set CPU execution provider")?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .context("Failed to set optimization level")?
                .with_intra_threads(4)
                .context("Failed to set intra threads")?
                .commit_from_file(model_path)
                .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))
        }
    }
}

/// Mean of token embeddings weighted by the attention mask, L2-normalized
///
/// `token_embeddings` is `[batch, seq_len, hidden_dim]`.
fn mean_pool(token_embeddings: ArrayViewD<'_, f32>, mask: &Array2<i64>) -> Result<Vec<Vec<f32>>> {
    let shape = token_embeddings.shape();
    if shape.len() != 3 || shape[2] != HIDDEN_DIM {
        anyhow::bail!(
            "Model outputs unexpected dimensions: {:?} (expected [batch, seq_len, {}])",
            shape,
            HIDDEN_DIM
        );
    }

    let mut pooled_batch = Vec::with_capacity(shape[0]);
    for (row, item) in token_embeddings.axis_iter(Axis(0)).enumerate() {
        let mut pooled = vec![0.0f32; HIDDEN_DIM];
        let mut sum_mask = 0.0f32;

        for (token, embedding) in item.axis_iter(Axis(0)).enumerate() {
            let weight = mask[[row, token]] as f32;
            if weight == 0.0 {
                continue;
            }
            sum_mask += weight;
            for (acc, value) in pooled.iter_mut().zip(embedding.iter()) {
                *acc += value * weight;
            }
        }

        for value in &mut pooled {
            *value /= sum_mask.max(1e-9);
        }
        let norm = pooled.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut pooled {
                *value /= norm;
            }
        }
        pooled_batch.push(pooled);
    }

    Ok(pooled_batch)
}

#[async_trait]
impl Embedder for OnnxEmbeddingModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Model returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            let model = self.clone();
            let batch = batch.to_vec();
            let vectors = tokio::task::spawn_blocking(move || model.run_batch(batch))
                .await
                .context("Embedding task panicked")??;
            embeddings.extend(vectors);
        }
        debug!("Embedded {} texts with {}", embeddings.len(), self.model_name);

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
