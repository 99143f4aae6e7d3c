// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Application configuration loaded from environment variables
//!
//! Binaries call `dotenv::dotenv()` first, so a `.env` file next to the
//! working directory is honoured (this is where `GOOGLE_API_KEY` usually lives).

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 1_000;
pub const DEFAULT_TOP_K: usize = 4;
pub const MAX_TOP_K: usize = 50;

/// Which embedding implementation backs the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// all-MiniLM-L6-v2 through ONNX Runtime
    Onnx,
    /// Deterministic hash vectors (not semantic, offline/testing only)
    Hash,
}

impl FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "onnx" => Ok(Self::Onnx),
            "hash" => Ok(Self::Hash),
            other => Err(format!("unknown embedding backend '{}' (expected onnx or hash)", other)),
        }
    }
}

/// Embedding model configuration
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Model name (e.g., "all-MiniLM-L6-v2")
    pub model_name: String,
    /// Path to ONNX model file
    pub model_path: PathBuf,
    /// Path to tokenizer JSON file
    pub tokenizer_path: PathBuf,
    /// Expected embedding dimensions
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Onnx,
            model_name: DEFAULT_EMBEDDING_MODEL.to_string(),
            model_path: PathBuf::from("./models/all-MiniLM-L6-v2-onnx/model.onnx"),
            tokenizer_path: PathBuf::from("./models/all-MiniLM-L6-v2-onnx/tokenizer.json"),
            dimensions: 384,
        }
    }
}

/// Hosted completion API configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            temperature: 0.3,
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Indexing and retrieval parameters
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// Directory holding the persisted index
    pub index_dir: PathBuf,
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
    /// Passages retrieved per question
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("./vector_index"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl RagConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("Chunk size must be greater than 0".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }
        if self.top_k == 0 || self.top_k > MAX_TOP_K {
            return Err(format!("top_k must be between 1 and {}", MAX_TOP_K));
        }
        Ok(())
    }
}

/// Top-level configuration shared by the server and the CLI
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub listen_addr: String,
    pub max_upload_bytes: usize,
    pub rag: RagConfig,
    pub embedding: EmbeddingConfig,
    pub gemini: GeminiConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults_rag = RagConfig::default();
        let defaults_embedding = EmbeddingConfig::default();
        let defaults_gemini = GeminiConfig::default();

        let api_port = env::var("API_PORT").unwrap_or_else(|_| "8080".to_string());

        Self {
            listen_addr: env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| format!("0.0.0.0:{}", api_port)),
            max_upload_bytes: parse_env("MAX_UPLOAD_MB").unwrap_or(64usize) * 1024 * 1024,
            rag: RagConfig {
                index_dir: env::var("INDEX_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults_rag.index_dir),
                chunk_size: parse_env("CHUNK_SIZE").unwrap_or(defaults_rag.chunk_size),
                chunk_overlap: parse_env("CHUNK_OVERLAP").unwrap_or(defaults_rag.chunk_overlap),
                top_k: parse_env("RETRIEVAL_TOP_K").unwrap_or(defaults_rag.top_k),
            },
            embedding: EmbeddingConfig {
                backend: parse_env("EMBEDDING_BACKEND").unwrap_or(defaults_embedding.backend),
                model_name: defaults_embedding.model_name,
                model_path: env::var("EMBEDDING_MODEL_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults_embedding.model_path),
                tokenizer_path: env::var("EMBEDDING_TOKENIZER_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults_embedding.tokenizer_path),
                dimensions: defaults_embedding.dimensions,
            },
            gemini: GeminiConfig {
                api_key: env::var("GOOGLE_API_KEY")
                    .ok()
                    .filter(|key| !key.trim().is_empty()),
                model: env::var("GEMINI_MODEL").unwrap_or(defaults_gemini.model),
                temperature: parse_env("GEMINI_TEMPERATURE").unwrap_or(defaults_gemini.temperature),
                api_base: env::var("GEMINI_API_BASE").unwrap_or(defaults_gemini.api_base),
                timeout: parse_env::<u64>("GEMINI_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults_gemini.timeout),
            },
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.rag.validate()?;
        if !(0.0..=2.0).contains(&self.gemini.temperature) {
            return Err(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.gemini.temperature
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err("Upload limit must be greater than 0".to_string());
        }
        if self.gemini.model.trim().is_empty() {
            return Err("Gemini model name cannot be empty".to_string());
        }
        Ok(())
    }

    /// Whether a Gemini API key was found
    pub fn has_api_key(&self) -> bool {
        self.gemini.api_key.is_some()
    }
}

fn parse_env<T>(name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    parse_value(name, env::var(name).ok())
}

/// Parse a raw variable value; unparsable values are logged and ignored
fn parse_value<T>(name: &str, raw: Option<String>) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring {}={:?}: {}; using the default", name, raw, e);
            None
        }
    }
}
