// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Single-page web UI served at `/`
//!
//! The page talks to the JSON API: `/health` for the key and index state,
//! `/v1/documents` for uploads and `/v1/ask` for questions.

use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../static/index.html");

pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}
