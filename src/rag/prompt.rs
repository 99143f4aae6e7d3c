// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Question-answering prompt

use crate::vector::RetrievedChunk;

pub const NOT_IN_CONTEXT: &str = "answer is not available in the context";

const INSTRUCTIONS: &str = "Answer the question as detailed as possible from the provided context. \
If the answer is not in provided context, say \"answer is not available in the context\".";

/// Retrieved passages joined by a blank line, in retrieval order
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Fill the template with all retrieved passages ("stuff" strategy)
pub fn build_prompt(question: &str, chunks: &[RetrievedChunk]) -> String {
    format!(
        "{}\n\nContext:\n {}\n\nQuestion:\n{}\n\nAnswer:\n",
        INSTRUCTIONS,
        build_context(chunks),
        question
    )
}
