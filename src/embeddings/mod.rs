// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text embedding backends

pub mod onnx_model;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{EmbeddingBackend, EmbeddingConfig};
pub use onnx_model::OnnxEmbeddingModel;

/// Maps text to fixed-size vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Deterministic pseudo-random unit vectors seeded from a SHA-256 of the text
///
/// Identical text always maps to the identical vector, so exact-match
/// retrieval works, but there is no notion of semantic similarity.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    model_name: String,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(anyhow!("Embedding dimension must be greater than 0"));
        }
        Ok(Self {
            dimension,
            model_name: format!("hash-{}", dimension),
        })
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let digest = Sha256::digest(text.as_bytes());
        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&digest[..8]);
        let mut current_seed = u64::from_le_bytes(seed_bytes);

        let mut embedding = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            // LCG step mixed with the position
            current_seed =
                (current_seed.wrapping_mul(1664525).wrapping_add(1013904223)) ^ (i as u64);
            let value = (current_seed as f64 / u64::MAX as f64) * 2.0 - 1.0;
            embedding.push(value as f32);
        }

        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.generate(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.generate(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Build the embedder selected by configuration
pub async fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.backend {
        EmbeddingBackend::Onnx => {
            let model = OnnxEmbeddingModel::new(
                config.model_name.clone(),
                &config.model_path,
                &config.tokenizer_path,
            )
            .await?;
            if model.dimension() != config.dimensions {
                return Err(anyhow!(
                    "Embedding model has {} dimensions, configuration expects {}",
                    model.dimension(),
                    config.dimensions
                ));
            }
            info!("Embedding backend: ONNX ({})", model.model_name());
            Ok(Arc::new(model))
        }
        EmbeddingBackend::Hash => {
            warn!("Embedding backend: hash (deterministic, not semantic)");
            Ok(Arc::new(HashEmbedder::new(config.dimensions)?))
        }
    }
}
