// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the question-answering pipeline
//!
//! Covers the whole flow:
//! - upload validation (no files, non-PDF, unreadable PDF)
//! - indexing (no extractable text, embedding and index failures)
//! - answering (no index yet, missing API key, completion API failures)

use thiserror::Error;

use crate::documents::DocumentError;
use crate::llm::CompletionError;
use crate::vector::IndexError;

pub const NO_FILES_MESSAGE: &str = "Please upload PDF files first";
pub const INDEX_NOT_READY_MESSAGE: &str = "Please upload and process PDFs first";

#[derive(Error, Debug)]
pub enum RagError {
    /// Process was requested with no files
    #[error("No files uploaded")]
    NoFiles,

    /// Question was empty or whitespace
    #[error("Question cannot be empty")]
    EmptyQuestion,

    /// A file could not be read as a PDF
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// None of the uploaded documents produced any text
    #[error("No text could be extracted from the uploaded documents")]
    NoText,

    /// Asked before any index was built or loaded
    #[error("No document index is loaded")]
    IndexNotReady,

    /// GOOGLE_API_KEY was not configured
    #[error("GOOGLE_API_KEY is not configured")]
    MissingApiKey,

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Completion failed: {0}")]
    Completion(#[from] CompletionError),

    /// Invalid chunking or retrieval parameters
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Internal(err.to_string())
    }
}

impl RagError {
    /// Message suitable for showing to the person using the UI
    pub fn user_message(&self) -> String {
        match self {
            RagError::NoFiles => NO_FILES_MESSAGE.to_string(),
            RagError::IndexNotReady => INDEX_NOT_READY_MESSAGE.to_string(),
            RagError::MissingApiKey => {
                "Google API key not found. Set GOOGLE_API_KEY in your .env file".to_string()
            }
            RagError::NoText => {
                "No text could be extracted from the uploaded PDFs (scanned documents are not supported)"
                    .to_string()
            }
            RagError::Document(DocumentError::NotPdf(name)) => {
                format!("'{}' is not a PDF file", name)
            }
            RagError::Index(IndexError::ModelMismatch { .. })
            | RagError::Index(IndexError::DimensionMismatch { .. }) => {
                "The saved index was built with a different embedding model. Please process your PDFs again"
                    .to_string()
            }
            RagError::Completion(CompletionError::RateLimited { .. }) => {
                "The language model is rate limited, please try again shortly".to_string()
            }
            RagError::Completion(CompletionError::Unauthorized(_)) => {
                "The Google API key was rejected".to_string()
            }
            RagError::Completion(CompletionError::Timeout) => {
                "The language model did not respond in time".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Stable code for logging and API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            RagError::NoFiles => "NO_FILES",
            RagError::EmptyQuestion => "EMPTY_QUESTION",
            RagError::Document(DocumentError::NotPdf(_)) => "NOT_PDF",
            RagError::Document(_) => "INVALID_PDF",
            RagError::NoText => "NO_TEXT",
            RagError::IndexNotReady => "INDEX_NOT_READY",
            RagError::MissingApiKey => "MISSING_API_KEY",
            RagError::Index(IndexError::ModelMismatch { .. })
            | RagError::Index(IndexError::DimensionMismatch { .. }) => "INDEX_INCOMPATIBLE",
            RagError::Index(_) => "INDEX_ERROR",
            RagError::Completion(CompletionError::RateLimited { .. }) => "RATE_LIMITED",
            RagError::Completion(CompletionError::Timeout) => "COMPLETION_TIMEOUT",
            RagError::Completion(_) => "COMPLETION_FAILED",
            RagError::Config(_) => "CONFIG_ERROR",
            RagError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            RagError::Completion(err) => err.is_retryable(),
            _ => false,
        }
    }
}
