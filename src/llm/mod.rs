// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Hosted completion models

pub mod gemini;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use gemini::GeminiClient;

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Rate limit exceeded, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("API key rejected: {0}")]
    Unauthorized(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Response blocked: {0}")]
    Blocked(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl CompletionError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CompletionError::RateLimited { .. }
                | CompletionError::Timeout
                | CompletionError::Network(_)
        ) || matches!(self, CompletionError::Api { status, .. } if *status >= 500)
    }
}

/// Generated answer with usage accounting
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub finish_reason: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Generate a completion for a single-turn prompt
    async fn complete(&self, prompt: &str) -> Result<Completion, CompletionError>;

    fn model_name(&self) -> String;
}
