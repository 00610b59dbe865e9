use std::sync::Arc;

use anyhow::{ensure, Result};
use tracing::{debug, error, info, instrument, warn};

use shopsearch_core::config::Settings;
use shopsearch_core::traits::{Embedder, VectorStore};
use shopsearch_core::types::{FilterSet, Product, SearchFailure, SearchOutcome, SearchResult};

use crate::extract::FilterExtractor;
use crate::scoring::{ScoringEngine, ScoringWeights};

/// End-to-end product search: implicit filter extraction, query embedding,
/// filtered vector retrieval and re-ranking.
///
/// The embedder and store are constructed once by the owning process and
/// handed in here; the engine only reads them.
pub struct ProductSearchEngine<S: VectorStore> {
    store: S,
    embedder: Arc<dyn Embedder>,
    extractor: FilterExtractor,
    scorer: ScoringEngine,
    default_limit: usize,
    similarity_threshold: f64,
}

impl<S: VectorStore> ProductSearchEngine<S> {
    pub fn new(store: S, embedder: Arc<dyn Embedder>, settings: &Settings) -> Self {
        Self {
            store,
            embedder,
            extractor: FilterExtractor::new(),
            scorer: ScoringEngine::new(ScoringWeights::from(&settings.search)),
            default_limit: settings.search.default_limit,
            similarity_threshold: settings.search.similarity_threshold,
        }
    }

    pub fn store(&self) -> &S { &self.store }

    /// Embed and upsert `products`. Returns the number indexed.
    pub fn index(&self, products: &[Product]) -> Result<usize> {
        if products.is_empty() {
            return Ok(0);
        }
        let embeddings = self.embedder.embed_products(products)?;
        ensure!(
            embeddings.len() == products.len(),
            "embedder returned {} vectors for {} products",
            embeddings.len(),
            products.len()
        );
        let dim = self.embedder.dim();
        if let Some(bad) = embeddings.iter().position(|e| e.len() != dim) {
            anyhow::bail!("embedding for product {} has {} dimensions, expected {dim}", products[bad].id, embeddings[bad].len());
        }
        self.store.upsert(products, &embeddings)?;
        info!(count = products.len(), "indexed products");
        Ok(products.len())
    }

    /// Rank products for `query`. Failures are reported in the outcome, never
    /// propagated; callers that only want a list use `into_results()`.
    #[instrument(skip_all, fields(query = %query))]
    pub fn search(&self, query: &str, filters: Option<&FilterSet>, limit: Option<usize>, with_breakdown: bool) -> SearchOutcome {
        let limit = limit.unwrap_or(self.default_limit);
        if limit == 0 {
            return SearchOutcome::NoMatches;
        }

        let filters = self.extractor.extract(query, filters.unwrap_or(&FilterSet::default()));
        if let Err(e) = filters.validate() {
            warn!(error = %e, "rejecting search filters");
            return SearchOutcome::Failed(SearchFailure::InvalidFilter(e.to_string()));
        }
        debug!(?filters, "effective filters");

        let query_vec = match self.embed_query(query) {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "query embedding failed");
                return SearchOutcome::Failed(SearchFailure::Embedding(e.to_string()));
            }
        };

        let candidates = match self.store.search(&query_vec, &filters, limit.saturating_mul(2), self.similarity_threshold) {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "vector search failed");
                return SearchOutcome::Failed(SearchFailure::Store(e.to_string()));
            }
        };
        if candidates.is_empty() {
            info!("no candidates");
            return SearchOutcome::NoMatches;
        }

        let fetched = candidates.len();
        let mut results: Vec<SearchResult> = candidates
            .into_iter()
            .map(|c| self.scorer.score_candidate(c, query, with_breakdown))
            .collect();
        // Stable: equal scores keep store order.
        results.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        results.truncate(limit);
        info!(fetched, returned = results.len(), "search complete");
        SearchOutcome::Found(results)
    }

    /// `search` flattened to the "empty on failure" list.
    pub fn search_results(&self, query: &str, filters: Option<&FilterSet>, limit: Option<usize>, with_breakdown: bool) -> Vec<SearchResult> {
        self.search(query, filters, limit, with_breakdown).into_results()
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let v = self.embedder.embed_query(query)?;
        ensure!(!v.is_empty(), "embedder returned an empty vector");
        ensure!(v.len() == self.embedder.dim(), "query vector has {} dimensions, expected {}", v.len(), self.embedder.dim());
        ensure!(v.iter().all(|x| x.is_finite()), "query vector contains non-finite values");
        Ok(v)
    }
}
