// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! AskRequest type for POST /v1/ask

use crate::api::ApiError;
use crate::config::MAX_TOP_K;
use serde::{Deserialize, Serialize};

pub const MAX_QUESTION_CHARS: usize = 4000;

/// Request body for POST /v1/ask
///
/// # Example
/// ```json
/// {
///   "question": "When is the invoice due?",
///   "topK": 4
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    pub question: String,

    /// Overrides the configured number of retrieved passages
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl AskRequest {
    /// Validates the ask request
    ///
    /// # Validation Rules
    /// 1. **question**: 1-4000 characters, not whitespace-only
    /// 2. **topK**: 1-50 when present
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.question.trim().is_empty() {
            return Err(ApiError::ValidationError {
                field: "question".to_string(),
                message: "question cannot be empty".to_string(),
            });
        }

        let chars = self.question.chars().count();
        if chars > MAX_QUESTION_CHARS {
            return Err(ApiError::ValidationError {
                field: "question".to_string(),
                message: format!(
                    "question must be at most {} characters (got {})",
                    MAX_QUESTION_CHARS, chars
                ),
            });
        }

        if let Some(k) = self.top_k {
            if k == 0 || k > MAX_TOP_K {
                return Err(ApiError::ValidationError {
                    field: "topK".to_string(),
                    message: format!("topK must be between 1 and {} (got {})", MAX_TOP_K, k),
                });
            }
        }

        Ok(())
    }
}
