// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Route registration, health and status

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use pdf_genie::api::{create_app, AppState, HealthResponse};
use pdf_genie::llm::CompletionModel;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

use crate::common::{hash_pipeline, CannedModel};

fn app(tmp: &TempDir, with_key: bool) -> Router {
    let completion: Option<Arc<dyn CompletionModel>> = if with_key {
        Some(Arc::new(CannedModel::new("ok")))
    } else {
        None
    };
    let pipeline = hash_pipeline(&tmp.path().join("index"), 32, completion);
    create_app(AppState::new(Arc::new(pipeline)), 1024 * 1024)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_index_page_served() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp, false)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Please upload and process PDFs first to start chatting!"));
}

#[tokio::test]
async fn test_health_without_api_key() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp, false)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health.status, "degraded");
    assert!(!health.api_key_configured);
    assert!(!health.index_ready);
    assert_eq!(health.issues.unwrap().len(), 2);
}

#[tokio::test]
async fn test_health_with_api_key() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp, true)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["apiKeyConfigured"], true);
}

#[tokio::test]
async fn test_status_endpoint() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp, true)
        .oneshot(Request::get("/v1/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["indexReady"], false);
    assert_eq!(body["embeddingModel"], "hash-32");
    assert_eq!(body["completionModel"], "canned");
    assert_eq!(body["topK"], 4);
}

#[tokio::test]
async fn test_version_endpoint() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp, false)
        .oneshot(Request::get("/v1/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["version"], pdf_genie::version::VERSION_NUMBER);
    assert!(body["features"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("gemini-answers")));
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp, false)
        .oneshot(Request::get("/v1/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["code"], "NOT_FOUND");
    assert!(body["requestId"].is_string());
}

#[tokio::test]
async fn test_ask_rejects_get() {
    let tmp = TempDir::new().unwrap();
    let response = app(&tmp, false)
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/v1/ask")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
