// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PDF text extraction (lopdf)

use lopdf::Document;
use tracing::{debug, warn};

use super::errors::DocumentError;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Text of a single uploaded PDF, one entry per page in page order
#[derive(Debug, Clone, PartialEq)]
pub struct PdfDocument {
    pub file_name: String,
    pub pages: Vec<String>,
}

impl PdfDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All page text concatenated in page order
    pub fn text(&self) -> String {
        self.pages.concat()
    }

    /// Byte offset in [`PdfDocument::text`] at which each page starts
    pub fn page_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.pages.len());
        let mut offset = 0;
        for page in &self.pages {
            offsets.push(offset);
            offset += page.len();
        }
        offsets
    }

    /// True when no page produced any non-whitespace text
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }
}

/// Accepts files named `*.pdf` or starting with the `%PDF-` header
pub fn is_pdf(file_name: &str, bytes: &[u8]) -> bool {
    file_name.to_lowercase().ends_with(".pdf") || bytes.starts_with(PDF_MAGIC)
}

/// Extract text page by page from an in-memory PDF
///
/// A page whose text cannot be decoded contributes an empty string. Only a
/// file that cannot be parsed at all is an error.
pub fn extract_pdf(file_name: &str, bytes: &[u8]) -> Result<PdfDocument, DocumentError> {
    if bytes.is_empty() {
        return Err(DocumentError::Empty(file_name.to_string()));
    }
    if !is_pdf(file_name, bytes) {
        return Err(DocumentError::NotPdf(file_name.to_string()));
    }

    let document = Document::load_mem(bytes).map_err(|e| DocumentError::ParseFailed {
        file_name: file_name.to_string(),
        reason: e.to_string(),
    })?;

    let pages = document.get_pages();
    if document.is_encrypted() && pages.is_empty() {
        return Err(DocumentError::Encrypted(file_name.to_string()));
    }

    let mut texts = Vec::with_capacity(pages.len());
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => texts.push(text),
            Err(e) => {
                warn!(
                    "Could not extract text from page {} of '{}': {}",
                    page_number, file_name, e
                );
                texts.push(String::new());
            }
        }
    }

    debug!(
        "Extracted {} pages ({} bytes of text) from '{}'",
        texts.len(),
        texts.iter().map(String::len).sum::<usize>(),
        file_name
    );

    Ok(PdfDocument {
        file_name: file_name.to_string(),
        pages: texts,
    })
}
