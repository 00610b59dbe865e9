//! Seams to the two collaborators of the query engine: the embedding model
//! and the vector store. Both are long-lived and shared read-only across
//! searches once constructed.

use serde::Serialize;
use std::sync::Arc;

use crate::error::Error;
use crate::types::{Candidate, FilterSet, Product};

/// Descriptive facts about a loaded embedder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub embedding_dimension: usize,
    pub max_sequence_length: usize,
    pub batch_size: usize,
}

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    /// Embedders without a named model report "custom"; `batch_size` 0 means one batch per call.
    fn model_info(&self) -> ModelInfo {
        ModelInfo { model_name: "custom".to_string(), embedding_dimension: self.dim(), max_sequence_length: self.max_len(), batch_size: 0 }
    }

    /// Embed a search query. The text is trimmed first.
    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut out = self.embed_batch(&[text.trim().to_string()])?;
        out.pop().ok_or_else(|| Error::Embedding("embedder returned no vector".into()).into())
    }

    /// Embed catalog entries, one vector per product, in input order.
    fn embed_products(&self, products: &[Product]) -> anyhow::Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = products.iter().map(|p| p.embedding_text(self.max_len())).collect();
        self.embed_batch(&texts)
    }
}

pub trait VectorStore: Send + Sync {
    /// Insert or replace products keyed by `Product::id`.
    fn upsert(&self, products: &[Product], embeddings: &[Vec<f32>]) -> anyhow::Result<()>;

    /// Nearest products to `query_vec` satisfying `filter`, best first, at most
    /// `limit` of them, none scoring below `min_score`.
    fn search(&self, query_vec: &[f32], filter: &FilterSet, limit: usize, min_score: f64) -> anyhow::Result<Vec<Candidate>>;

    fn count(&self) -> anyhow::Result<usize>;
}

impl<T: Embedder + ?Sized> Embedder for Arc<T> {
    fn dim(&self) -> usize { (**self).dim() }
    fn max_len(&self) -> usize { (**self).max_len() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> { (**self).embed_batch(texts) }
    fn model_info(&self) -> ModelInfo { (**self).model_info() }
}

impl<T: VectorStore + ?Sized> VectorStore for Arc<T> {
    fn upsert(&self, products: &[Product], embeddings: &[Vec<f32>]) -> anyhow::Result<()> { (**self).upsert(products, embeddings) }
    fn search(&self, query_vec: &[f32], filter: &FilterSet, limit: usize, min_score: f64) -> anyhow::Result<Vec<Candidate>> {
        (**self).search(query_vec, filter, limit, min_score)
    }
    fn count(&self) -> anyhow::Result<usize> { (**self).count() }
}
