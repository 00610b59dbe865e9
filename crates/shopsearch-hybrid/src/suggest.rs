//! Query suggestions and the static filter vocabulary for UI widgets.

use serde::Serialize;

use shopsearch_core::config::CatalogSettings;
use shopsearch_core::types::Availability;

pub const RATING_MINIMUMS: [f64; 5] = [3.0, 3.5, 4.0, 4.5, 5.0];

/// Selectable values for filter widgets, straight from configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub categories: Vec<String>,
    pub price_ranges: Vec<String>,
    pub availability_options: Vec<String>,
    pub rating_minimums: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct SuggestionIndex {
    sample_queries: Vec<String>,
    categories: Vec<String>,
    price_ranges: Vec<String>,
}

impl SuggestionIndex {
    pub fn new(catalog: &CatalogSettings) -> Self {
        Self {
            sample_queries: catalog.sample_queries.clone(),
            categories: catalog.categories.clone(),
            price_ranges: catalog.price_ranges.iter().map(|r| r.label.clone()).collect(),
        }
    }

    /// Sample queries containing `partial` (case-insensitive), then matching
    /// categories as "products in {category}", capped at `limit`.
    pub fn suggest(&self, partial: &str, limit: usize) -> Vec<String> {
        let needle = partial.to_lowercase();
        let queries = self
            .sample_queries
            .iter()
            .filter(|q| q.to_lowercase().contains(&needle))
            .cloned();
        let categories = self
            .categories
            .iter()
            .filter(|c| c.to_lowercase().contains(&needle))
            .map(|c| format!("products in {c}"));
        queries.chain(categories).take(limit).collect()
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            categories: self.categories.clone(),
            price_ranges: self.price_ranges.clone(),
            availability_options: Availability::KNOWN.iter().map(|a| a.as_str().to_string()).collect(),
            rating_minimums: RATING_MINIMUMS.to_vec(),
        }
    }
}

impl Default for SuggestionIndex {
    fn default() -> Self { Self::new(&CatalogSettings::default()) }
}
