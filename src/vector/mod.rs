// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vector similarity index over document chunks

pub mod hnsw;
pub mod store;

pub use hnsw::{HnswIndex, SearchHit};
pub use store::{DocumentIndex, DocumentRecord, IndexError, IndexManifest, RetrievedChunk};
