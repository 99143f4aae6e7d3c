// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HNSW index for approximate nearest neighbour search over chunk embeddings
//!
//! Vectors are L2-normalized before insertion and search, so the cosine
//! distance reported by `hnsw_rs` converts to similarity as `1 - distance`.
//!
//! ```rust,ignore
//! let index = HnswIndex::build(vectors, 384)?;
//! for hit in index.search(&query, 4, f32::MIN)? {
//!     println!("{}: {:.3}", hit.id, hit.score);
//! }
//! ```

use anyhow::{anyhow, Result};
use hnsw_rs::hnsw::{Hnsw, Neighbour};
use hnsw_rs::prelude::*;

/// Position of a vector in the slice given to [`HnswIndex::build`], with its similarity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub id: usize,
    /// Cosine similarity (-1.0 to 1.0)
    pub score: f32,
}

pub struct HnswIndex {
    hnsw: Hnsw<'static, f32, DistCosine>,
    len: usize,
    dimensions: usize,
}

impl std::fmt::Debug for HnswIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HnswIndex")
            .field("len", &self.len)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl HnswIndex {
    /// Build an index; vector `i` is reported back as `SearchHit { id: i, .. }`
    ///
    /// # Errors
    ///
    /// Returns error if a vector has the wrong dimensions or contains NaN/Infinity.
    pub fn build(vectors: &[Vec<f32>], dimensions: usize) -> Result<Self> {
        for (i, vector) in vectors.iter().enumerate() {
            if vector.len() != dimensions {
                return Err(anyhow!(
                    "Vector {} has wrong dimensions: expected {}, got {}",
                    i,
                    dimensions,
                    vector.len()
                ));
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(anyhow!("Vector {} contains NaN or Infinity values", i));
            }
        }

        let max_nb_connection = 16;
        let ef_construction = 200;
        let max_layer = if vectors.len() > 1 {
            ((vectors.len() as f32).log2().ceil() as usize).clamp(4, 16)
        } else {
            4
        };

        let mut hnsw: Hnsw<f32, DistCosine> = Hnsw::new(
            max_nb_connection,
            vectors.len().max(1),
            max_layer,
            ef_construction,
            DistCosine,
        );

        for (id, vector) in vectors.iter().enumerate() {
            let normalized = normalize_vector(vector);
            hnsw.insert((&normalized, id));
        }
        hnsw.set_searching_mode(true);

        Ok(Self {
            hnsw,
            len: vectors.len(),
            dimensions,
        })
    }

    /// Up to `k` nearest vectors with similarity >= `threshold`, highest first
    pub fn search(&self, query: &[f32], k: usize, threshold: f32) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimensions {
            return Err(anyhow!(
                "Query has wrong dimensions: expected {}, got {}",
                self.dimensions,
                query.len()
            ));
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(anyhow!("Query contains NaN or Infinity values"));
        }
        if self.len == 0 || k == 0 {
            return Ok(vec![]);
        }

        let normalized_query = normalize_vector(query);
        let k = k.min(self.len);
        let ef_search = (k * 2).max(64);
        let neighbours: Vec<Neighbour> = self.hnsw.search(&normalized_query, k, ef_search);

        let mut hits: Vec<SearchHit> = neighbours
            .into_iter()
            .map(|n| SearchHit {
                id: n.d_id,
                score: 1.0 - n.distance,
            })
            .filter(|hit| hit.id < self.len && hit.score >= threshold)
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);

        Ok(hits)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Divide by the L2 norm; zero and non-finite magnitudes are returned unchanged
pub(crate) fn normalize_vector(vector: &[f32]) -> Vec<f32> {
    let magnitude: f32 = vector.iter().map(|&x| x * x).sum::<f32>().sqrt();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return vector.to_vec();
    }
    vector.iter().map(|&x| x / magnitude).collect()
}
