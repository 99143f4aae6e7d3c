// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Health and status endpoints

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::server::AppState;
use crate::rag::PipelineStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "healthy", or "degraded" when questions cannot be answered yet
    pub status: String,
    pub api_key_configured: bool,
    pub index_ready: bool,
    pub version: String,
    pub uptime_secs: u64,
    pub issues: Option<Vec<String>>,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.pipeline.status().await;

    let mut issues = Vec::new();
    if !status.api_key_configured {
        issues.push("GOOGLE_API_KEY not configured".to_string());
    }
    if !status.index_ready {
        issues.push("No documents processed yet".to_string());
    }

    Json(HealthResponse {
        status: if status.api_key_configured {
            "healthy"
        } else {
            "degraded"
        }
        .to_string(),
        api_key_configured: status.api_key_configured,
        index_ready: status.index_ready,
        version: crate::version::VERSION_NUMBER.to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        issues: if issues.is_empty() { None } else { Some(issues) },
    })
}

pub async fn status_handler(State(state): State<AppState>) -> Json<PipelineStatus> {
    Json(state.pipeline.status().await)
}

pub async fn version_handler() -> Json<serde_json::Value> {
    Json(crate::version::get_version_info())
}
