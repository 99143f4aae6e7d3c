// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end process and ask flow with the hash embedder and a canned model

use crate::common::{hash_pipeline, sample_pdf, CannedModel};
use async_trait::async_trait;
use pdf_genie::llm::{Completion, CompletionError, CompletionModel};
use pdf_genie::rag::{RagError, UploadedFile};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Notify;

fn invoice() -> UploadedFile {
    UploadedFile::new(
        "invoice.pdf",
        sample_pdf(&[
            "Invoice 2041 issued to Acme Corp",
            "Total amount due is 1200 EUR by March 31",
        ]),
    )
}

fn handbook() -> UploadedFile {
    UploadedFile::new(
        "handbook.pdf",
        sample_pdf(&["Employees receive 25 vacation days per year"]),
    )
}

#[tokio::test]
async fn test_process_then_ask() {
    let tmp = TempDir::new().unwrap();
    let model = Arc::new(CannedModel::new("The total due is 1200 EUR."));
    let completion: Arc<dyn CompletionModel> = model.clone();
    let pipeline = hash_pipeline(&tmp.path().join("index"), 64, Some(completion));

    let summary = pipeline
        .process_documents(vec![invoice(), handbook()])
        .await
        .unwrap();
    assert_eq!(summary.document_count, 2);
    assert_eq!(summary.page_count, 3);
    assert_eq!(summary.chunk_count, 2);
    assert_eq!(summary.message, "Processed 2 PDF(s)!");
    assert_eq!(summary.embedding_model, "hash-64");

    let answer = pipeline.ask("How much is due?", None).await.unwrap();
    assert_eq!(answer.answer, "The total due is 1200 EUR.");
    assert_eq!(answer.model, "canned");
    assert_eq!(answer.sources.len(), 2);
    assert_eq!(answer.prompt_tokens, 10);

    let prompt = model.last_prompt().unwrap();
    assert!(prompt.contains("Total amount due is 1200 EUR"));
    assert!(prompt.contains("25 vacation days"));
    assert!(prompt.contains("Question:\nHow much is due?"));
    assert!(prompt.contains("answer is not available in the context"));
}

#[tokio::test]
async fn test_sources_carry_page_ranges() {
    let tmp = TempDir::new().unwrap();
    let completion: Arc<dyn CompletionModel> = Arc::new(CannedModel::new("ok"));
    let pipeline = hash_pipeline(&tmp.path().join("index"), 32, Some(completion));
    pipeline.process_documents(vec![invoice()]).await.unwrap();

    let answer = pipeline.ask("Who was invoiced?", Some(1)).await.unwrap();
    assert_eq!(answer.sources.len(), 1);
    let source = &answer.sources[0];
    assert_eq!(source.file_name, "invoice.pdf");
    assert_eq!(source.chunk_index, 0);
    assert_eq!(source.page_start, 1);
    assert_eq!(source.page_end, 2);
}

#[tokio::test]
async fn test_top_k_bounds() {
    let tmp = TempDir::new().unwrap();
    let completion: Arc<dyn CompletionModel> = Arc::new(CannedModel::new("ok"));
    let pipeline = hash_pipeline(&tmp.path().join("index"), 32, Some(completion));
    pipeline.process_documents(vec![invoice()]).await.unwrap();

    let err = pipeline.ask("anything", Some(0)).await.unwrap_err();
    assert_eq!(err.error_code(), "CONFIG_ERROR");
    let err = pipeline.ask("anything", Some(51)).await.unwrap_err();
    assert_eq!(err.error_code(), "CONFIG_ERROR");
}

#[tokio::test]
async fn test_processing_without_api_key() {
    let tmp = TempDir::new().unwrap();
    let pipeline = hash_pipeline(&tmp.path().join("index"), 32, None);

    pipeline.process_documents(vec![handbook()]).await.unwrap();
    let status = pipeline.status().await;
    assert!(status.index_ready);
    assert!(!status.api_key_configured);

    let err = pipeline.ask("How many vacation days?", None).await.unwrap_err();
    assert!(matches!(err, RagError::MissingApiKey));
}

#[tokio::test]
async fn test_reprocessing_replaces_index() {
    let tmp = TempDir::new().unwrap();
    let pipeline = hash_pipeline(&tmp.path().join("index"), 32, None);

    pipeline.process_documents(vec![invoice()]).await.unwrap();
    pipeline.process_documents(vec![handbook()]).await.unwrap();

    let status = pipeline.status().await;
    assert_eq!(status.documents, vec!["handbook.pdf".to_string()]);
    assert_eq!(status.chunk_count, 1);
}

#[tokio::test]
async fn test_failed_processing_keeps_previous_index() {
    let tmp = TempDir::new().unwrap();
    let pipeline = hash_pipeline(&tmp.path().join("index"), 32, None);
    pipeline.process_documents(vec![invoice()]).await.unwrap();

    let err = pipeline
        .process_documents(vec![
            handbook(),
            UploadedFile::new("broken.pdf", b"%PDF-1.4 truncated".to_vec()),
        ])
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_PDF");

    let status = pipeline.status().await;
    assert_eq!(status.documents, vec!["invoice.pdf".to_string()]);
}

#[tokio::test]
async fn test_blank_pdf_has_no_text() {
    let tmp = TempDir::new().unwrap();
    let pipeline = hash_pipeline(&tmp.path().join("index"), 32, None);

    let err = pipeline
        .process_documents(vec![UploadedFile::new("blank.pdf", sample_pdf(&["   "]))])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::NoText));
    assert!(pipeline.current_index().await.is_none());
}

#[tokio::test]
async fn test_concurrent_questions_share_index() {
    let tmp = TempDir::new().unwrap();
    let completion: Arc<dyn CompletionModel> = Arc::new(CannedModel::new("ok"));
    let pipeline = Arc::new(hash_pipeline(
        &tmp.path().join("index"),
        32,
        Some(completion),
    ));
    pipeline
        .process_documents(vec![invoice(), handbook()])
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        pipeline.ask("How much is due?", None),
        pipeline.ask("How many vacation days?", None)
    );
    assert_eq!(a.unwrap().sources.len(), 2);
    assert_eq!(b.unwrap().sources.len(), 2);
}

/// Completion model that blocks inside `complete` until released
#[derive(Default)]
struct GatedModel {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl CompletionModel for GatedModel {
    async fn complete(&self, _prompt: &str) -> Result<Completion, CompletionError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Completion {
            text: "done".to_string(),
            model: "gated".to_string(),
            prompt_tokens: 1,
            completion_tokens: 1,
            finish_reason: Some("STOP".to_string()),
        })
    }

    fn model_name(&self) -> String {
        "gated".to_string()
    }
}

#[tokio::test]
async fn test_question_keeps_index_snapshot_during_reprocessing() {
    let tmp = TempDir::new().unwrap();
    let model = Arc::new(GatedModel::default());
    let completion: Arc<dyn CompletionModel> = model.clone();
    let pipeline = Arc::new(hash_pipeline(
        &tmp.path().join("index"),
        32,
        Some(completion),
    ));
    pipeline.process_documents(vec![invoice()]).await.unwrap();

    let asking = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.ask("How much is due?", None).await })
    };

    // question has retrieved from the invoice index and is waiting on the model
    model.entered.notified().await;
    pipeline.process_documents(vec![handbook()]).await.unwrap();
    model.release.notify_one();

    let answer = asking.await.unwrap().unwrap();
    assert_eq!(answer.answer, "done");
    assert!(!answer.sources.is_empty());
    assert!(answer.sources.iter().all(|s| s.file_name == "invoice.pdf"));

    let status = pipeline.status().await;
    assert_eq!(status.documents, vec!["handbook.pdf".to_string()]);
}
