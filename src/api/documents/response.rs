// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ProcessResponse type for POST /v1/documents

use crate::rag::ProcessSummary;
use crate::vector::DocumentRecord;
use serde::{Deserialize, Serialize};

/// Response body for POST /v1/documents
///
/// # Example
/// ```json
/// {
///   "message": "Processed 2 PDF(s)!",
///   "documentCount": 2,
///   "pageCount": 17,
///   "chunkCount": 9,
///   "documents": [{"fileName": "a.pdf", "sha256": "…", "pages": 12, "chunks": 6}],
///   "embeddingModel": "all-MiniLM-L6-v2",
///   "processingTimeMs": 812,
///   "requestId": "…"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub message: String,
    pub document_count: usize,
    pub page_count: usize,
    pub chunk_count: usize,
    pub documents: Vec<DocumentRecord>,
    pub embedding_model: String,
    pub processing_time_ms: u64,
    pub request_id: String,
}

impl ProcessResponse {
    pub fn from_summary(summary: ProcessSummary, request_id: String) -> Self {
        Self {
            message: summary.message,
            document_count: summary.document_count,
            page_count: summary.page_count,
            chunk_count: summary.chunk_count,
            documents: summary.documents,
            embedding_model: summary.embedding_model,
            processing_time_ms: summary.elapsed_ms,
            request_id,
        }
    }
}
