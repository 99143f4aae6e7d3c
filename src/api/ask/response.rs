// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! AskResponse type for POST /v1/ask

use crate::rag::{Answer, SourceRef};
use serde::{Deserialize, Serialize};

/// Response body for POST /v1/ask
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    pub answer: String,
    pub model: String,
    pub sources: Vec<SourceResult>,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub processing_time_ms: u64,
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceResult {
    pub file_name: String,
    pub chunk_index: usize,
    pub page_start: usize,
    pub page_end: usize,
    pub score: f32,
}

impl From<SourceRef> for SourceResult {
    fn from(source: SourceRef) -> Self {
        Self {
            file_name: source.file_name,
            chunk_index: source.chunk_index,
            page_start: source.page_start,
            page_end: source.page_end,
            score: source.score,
        }
    }
}

impl AskResponse {
    pub fn from_answer(answer: Answer, request_id: String) -> Self {
        Self {
            answer: answer.answer,
            model: answer.model,
            sources: answer.sources.into_iter().map(SourceResult::from).collect(),
            prompt_tokens: answer.prompt_tokens,
            completion_tokens: answer.completion_tokens,
            processing_time_ms: answer.elapsed_ms,
            request_id,
        }
    }
}
