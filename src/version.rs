// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for PDF Genie

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2025-11-03";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "pdf-upload",
    "recursive-chunking",
    "minilm-embeddings",
    "hnsw-retrieval",
    "persistent-index",
    "gemini-answers",
    "source-citations",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("PDF Genie {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "date": BUILD_DATE,
        "features": FEATURES,
    })
}
