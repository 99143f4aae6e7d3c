// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! DocumentIndex build, search and save/load

use pdf_genie::chunking::TextChunk;
use pdf_genie::embeddings::HashEmbedder;
use pdf_genie::vector::{DocumentIndex, DocumentRecord};
use tempfile::TempDir;

fn chunks(texts: &[&str]) -> Vec<TextChunk> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| TextChunk {
            source: "notes.pdf".to_string(),
            chunk_index: i,
            page_start: i + 1,
            page_end: i + 1,
            text: text.to_string(),
        })
        .collect()
}

fn record(chunk_count: usize) -> Vec<DocumentRecord> {
    vec![DocumentRecord {
        file_name: "notes.pdf".to_string(),
        sha256: "00".repeat(32),
        pages: chunk_count,
        chunks: chunk_count,
    }]
}

const TEXTS: [&str; 6] = [
    "alpha section on onboarding",
    "beta section on payroll",
    "gamma section on travel",
    "delta section on security",
    "epsilon section on hardware",
    "zeta section on benefits",
];

#[tokio::test]
async fn test_exact_text_ranks_first() {
    let embedder = HashEmbedder::new(128).unwrap();
    let index = DocumentIndex::from_chunks(chunks(&TEXTS), record(6), &embedder)
        .await
        .unwrap();
    assert_eq!(index.chunk_count(), 6);
    assert_eq!(index.document_count(), 1);

    let hits = index
        .similarity_search("delta section on security", 4, &embedder)
        .await
        .unwrap();
    assert_eq!(hits.len(), 4);
    assert_eq!(hits[0].chunk.chunk_index, 3);
    assert!((hits[0].score - 1.0).abs() < 1e-4);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_k_larger_than_index() {
    let embedder = HashEmbedder::new(64).unwrap();
    let index = DocumentIndex::from_chunks(chunks(&TEXTS[..2]), record(2), &embedder)
        .await
        .unwrap();

    let hits = index.similarity_search("anything", 10, &embedder).await.unwrap();
    assert_eq!(hits.len(), 2);
}

#[tokio::test]
async fn test_saved_index_searches_identically() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("index");
    let embedder = HashEmbedder::new(64).unwrap();

    let index = DocumentIndex::from_chunks(chunks(&TEXTS), record(6), &embedder)
        .await
        .unwrap();
    index.save(&dir).unwrap();

    let loaded = DocumentIndex::load(&dir).unwrap();
    assert_eq!(loaded.manifest(), index.manifest());

    let hits = loaded
        .similarity_search("zeta section on benefits", 1, &embedder)
        .await
        .unwrap();
    assert_eq!(hits[0].chunk.text, "zeta section on benefits");
}

#[tokio::test]
async fn test_search_with_other_embedder_fails() {
    let embedder = HashEmbedder::new(64).unwrap();
    let index = DocumentIndex::from_chunks(chunks(&TEXTS), record(6), &embedder)
        .await
        .unwrap();

    let other = HashEmbedder::new(32).unwrap();
    assert!(index.similarity_search("alpha", 1, &other).await.is_err());
}
