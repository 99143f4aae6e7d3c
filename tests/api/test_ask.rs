// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /v1/ask

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use pdf_genie::api::{create_app, AppState, AskResponse};
use pdf_genie::llm::CompletionModel;
use pdf_genie::rag::{RagPipeline, UploadedFile};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

use crate::common::{hash_pipeline, sample_pdf, CannedModel};

fn ask_request(body: serde_json::Value) -> Request<Body> {
    Request::post("/v1/ask")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn app(pipeline: Arc<RagPipeline>) -> Router {
    create_app(AppState::new(pipeline), 1024 * 1024)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn processed_pipeline(tmp: &TempDir) -> Arc<RagPipeline> {
    let completion: Arc<dyn CompletionModel> =
        Arc::new(CannedModel::new("The lease ends in June 2027."));
    let pipeline = hash_pipeline(&tmp.path().join("index"), 32, Some(completion));
    pipeline
        .process_documents(vec![UploadedFile::new(
            "lease.pdf",
            sample_pdf(&["The lease term ends on 30 June 2027"]),
        )])
        .await
        .unwrap();
    Arc::new(pipeline)
}

#[tokio::test]
async fn test_ask_answers_from_index() {
    let tmp = TempDir::new().unwrap();
    let response = app(processed_pipeline(&tmp).await)
        .oneshot(ask_request(json!({ "question": "When does the lease end?" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let answer: AskResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(answer.answer, "The lease ends in June 2027.");
    assert_eq!(answer.model, "canned");
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].file_name, "lease.pdf");
    assert!(!answer.request_id.is_empty());
}

#[tokio::test]
async fn test_ask_before_processing() {
    let tmp = TempDir::new().unwrap();
    let completion: Arc<dyn CompletionModel> = Arc::new(CannedModel::new("unused"));
    let pipeline = Arc::new(hash_pipeline(&tmp.path().join("index"), 32, Some(completion)));

    let response = app(pipeline)
        .oneshot(ask_request(json!({ "question": "Anything?" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["code"], "INDEX_NOT_READY");
    assert_eq!(body["message"], "Please upload and process PDFs first");
}

#[tokio::test]
async fn test_ask_without_api_key() {
    let tmp = TempDir::new().unwrap();
    let pipeline = hash_pipeline(&tmp.path().join("index"), 32, None);
    pipeline
        .process_documents(vec![UploadedFile::new("a.pdf", sample_pdf(&["text"]))])
        .await
        .unwrap();

    let response = app(Arc::new(pipeline))
        .oneshot(ask_request(json!({ "question": "What is this?" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "MISSING_API_KEY");
}

#[tokio::test]
async fn test_ask_validation() {
    let tmp = TempDir::new().unwrap();
    let pipeline = processed_pipeline(&tmp).await;

    let cases = [
        json!({ "question": "   " }),
        json!({ "question": "x".repeat(4001) }),
        json!({ "question": "ok?", "topK": 0 }),
        json!({ "question": "ok?", "topK": 51 }),
    ];
    for case in cases {
        let response = app(pipeline.clone())
            .oneshot(ask_request(case.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "case: {}", case);
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_ask_malformed_json() {
    let tmp = TempDir::new().unwrap();
    let pipeline = processed_pipeline(&tmp).await;

    let request = Request::post("/v1/ask")
        .header("content-type", "application/json")
        .body(Body::from("{\"question\":"))
        .unwrap();
    let response = app(pipeline).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_JSON");
}
