// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Retrieval-augmented generation over uploaded PDFs

pub mod errors;
pub mod pipeline;
pub mod prompt;

pub use errors::{RagError, INDEX_NOT_READY_MESSAGE, NO_FILES_MESSAGE};
pub use pipeline::{Answer, PipelineStatus, ProcessSummary, RagPipeline, SourceRef, UploadedFile};
pub use prompt::build_prompt;
