//! In-memory product store for tests and development builds.
//!
//! Brute-force cosine similarity over every stored vector, with the
//! `FilterSet` evaluated in process. Candidates come back best first; equal
//! similarities keep insertion order.

use anyhow::{anyhow, ensure, Result};
use std::sync::RwLock;
use tracing::debug;

use shopsearch_core::traits::VectorStore;
use shopsearch_core::types::{Candidate, FilterSet, Product};
use shopsearch_embed::cosine_similarity;

pub struct MemoryStore {
    dimension: usize,
    rows: RwLock<Vec<(Product, Vec<f32>)>>,
}

impl MemoryStore {
    pub fn new(dimension: usize) -> Self {
        Self { dimension, rows: RwLock::new(Vec::new()) }
    }
}

impl Default for MemoryStore {
    fn default() -> Self { Self::new(384) }
}

impl VectorStore for MemoryStore {
    fn upsert(&self, products: &[Product], embeddings: &[Vec<f32>]) -> Result<()> {
        ensure!(products.len() == embeddings.len(), "products and embeddings length must match");
        ensure!(embeddings.iter().all(|v| v.len() == self.dimension), "embedding dimension must be {}", self.dimension);
        let mut rows = self.rows.write().map_err(|_| anyhow!("memory store lock poisoned"))?;
        for (product, vector) in products.iter().zip(embeddings) {
            match rows.iter_mut().find(|(p, _)| p.id == product.id) {
                Some(row) => *row = (product.clone(), vector.clone()),
                None => rows.push((product.clone(), vector.clone())),
            }
        }
        debug!(count = products.len(), "upserted products");
        Ok(())
    }

    fn search(&self, query_vec: &[f32], filter: &FilterSet, limit: usize, min_score: f64) -> Result<Vec<Candidate>> {
        let rows = self.rows.read().map_err(|_| anyhow!("memory store lock poisoned"))?;
        let mut hits: Vec<Candidate> = rows
            .iter()
            .filter(|(p, _)| filter.matches(p))
            .map(|(p, v)| Candidate { similarity: f64::from(cosine_similarity(query_vec, v)), product: p.clone() })
            .filter(|c| c.similarity >= min_score)
            .collect();
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(limit);
        Ok(hits)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.rows.read().map_err(|_| anyhow!("memory store lock poisoned"))?.len())
    }
}
