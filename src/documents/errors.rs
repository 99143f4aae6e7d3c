// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use thiserror::Error;

/// Errors raised while reading an uploaded document
#[derive(Error, Debug)]
pub enum DocumentError {
    /// File does not look like a PDF
    #[error("File '{0}' is not a PDF document")]
    NotPdf(String),

    /// Uploaded file had no bytes
    #[error("File '{0}' is empty")]
    Empty(String),

    /// lopdf could not parse the file
    #[error("Failed to parse PDF '{file_name}': {reason}")]
    ParseFailed { file_name: String, reason: String },

    /// Document is encrypted and cannot be read without a password
    #[error("PDF '{0}' is encrypted")]
    Encrypted(String),
}

impl DocumentError {
    pub fn file_name(&self) -> &str {
        match self {
            DocumentError::NotPdf(name)
            | DocumentError::Empty(name)
            | DocumentError::Encrypted(name) => name,
            DocumentError::ParseFailed { file_name, .. } => file_name,
        }
    }
}
