// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Saved index reload across pipeline instances

use crate::common::{hash_pipeline, sample_pdf, CannedModel};
use pdf_genie::llm::CompletionModel;
use pdf_genie::rag::UploadedFile;
use pdf_genie::vector::store::{CHUNKS_FILE, MANIFEST_FILE};
use pdf_genie::vector::DocumentIndex;
use std::sync::Arc;
use tempfile::TempDir;

fn report() -> UploadedFile {
    UploadedFile::new(
        "report.pdf",
        sample_pdf(&["Quarterly revenue grew 12 percent", "Churn fell to 3 percent"]),
    )
}

#[tokio::test]
async fn test_index_survives_restart() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("index");

    let first = hash_pipeline(&dir, 48, None);
    first.process_documents(vec![report()]).await.unwrap();
    assert!(DocumentIndex::exists(&dir));
    assert!(dir.join(MANIFEST_FILE).is_file());
    assert!(dir.join(CHUNKS_FILE).is_file());

    let completion: Arc<dyn CompletionModel> = Arc::new(CannedModel::new("12 percent"));
    let second = hash_pipeline(&dir, 48, Some(completion));
    assert!(second.load_existing().await.unwrap());

    let status = second.status().await;
    assert!(status.index_ready);
    assert_eq!(status.documents, vec!["report.pdf".to_string()]);
    assert_eq!(status.chunk_count, 1);
    assert!(status.indexed_at.is_some());

    let answer = second.ask("How much did revenue grow?", None).await.unwrap();
    assert_eq!(answer.sources[0].file_name, "report.pdf");
}

#[tokio::test]
async fn test_reload_with_different_embedder_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("index");

    hash_pipeline(&dir, 48, None)
        .process_documents(vec![report()])
        .await
        .unwrap();

    let other = hash_pipeline(&dir, 32, None);
    let err = other.load_existing().await.unwrap_err();
    assert_eq!(err.error_code(), "INDEX_INCOMPATIBLE");
    assert!(other.current_index().await.is_none());
}

#[tokio::test]
async fn test_corrupt_manifest_is_reported() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("index");

    hash_pipeline(&dir, 48, None)
        .process_documents(vec![report()])
        .await
        .unwrap();
    std::fs::write(dir.join(MANIFEST_FILE), b"{ not json").unwrap();

    let err = hash_pipeline(&dir, 48, None).load_existing().await.unwrap_err();
    assert_eq!(err.error_code(), "INDEX_ERROR");
}

#[tokio::test]
async fn test_resave_leaves_no_staging_directories() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("index");
    let pipeline = hash_pipeline(&dir, 48, None);

    pipeline.process_documents(vec![report()]).await.unwrap();
    pipeline.process_documents(vec![report()]).await.unwrap();

    let entries: Vec<String> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["index".to_string()]);
}
