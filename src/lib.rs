// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod documents;
pub mod embeddings;
pub mod llm;
pub mod rag;
pub mod vector;
pub mod version;

pub use config::AppConfig;
pub use rag::{Answer, ProcessSummary, RagError, RagPipeline, UploadedFile};
