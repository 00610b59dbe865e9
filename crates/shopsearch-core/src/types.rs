//! Domain types shared by the query engine, the embedders and the stores.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PriceRange;
use crate::error::{Error, Result};

pub type ProductId = String;

/// Free-form product specifications (e.g. `{"battery_life": "20h", "wireless": true}`).
pub type Specifications = serde_json::Map<String, serde_json::Value>;

/// Stock state of a product.
///
/// Labels outside the three known values deserialize to `Unknown`, which the
/// scorer treats like `InStock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Limited Stock")]
    LimitedStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(other)]
    Unknown,
}

impl Availability {
    pub const KNOWN: [Availability; 3] = [Self::InStock, Self::LimitedStock, Self::OutOfStock];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InStock => "In Stock",
            Self::LimitedStock => "Limited Stock",
            Self::OutOfStock => "Out of Stock",
            Self::Unknown => "Unknown",
        }
    }

    /// Case-insensitive lookup of a display label.
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        Self::KNOWN.into_iter().find(|a| a.as_str().eq_ignore_ascii_case(label)).unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// One catalog entry as stored in the vector store payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(alias = "product_id")]
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub brand: String,
    pub price: f64,
    pub rating: f64,
    #[serde(alias = "review_count")]
    pub num_reviews: u64,
    pub availability: Availability,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub specifications: Specifications,
}

impl Product {
    /// Text fed to the embedding model for this product: title, description,
    /// category, brand and up to three tags, cut to `max_chars` characters.
    pub fn embedding_text(&self, max_chars: usize) -> String {
        let mut text = format!(
            "{}. {} Category: {}. Brand: {}.",
            self.title, self.description, self.category, self.brand
        );
        if !self.tags.is_empty() {
            let key_tags: Vec<&str> = self.tags.iter().take(3).map(String::as_str).collect();
            text.push_str(" Tags: ");
            text.push_str(&key_tags.join(", "));
            text.push('.');
        }
        if text.chars().count() > max_chars {
            text = text.chars().take(max_chars).collect();
        }
        text
    }
}

/// Structured constraints applied to a search.
///
/// Every field is optional and an empty set matches every product. Price
/// bounds and the rating floor are inclusive. `tags` matches when the product
/// carries any of the listed tags; an empty list places no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<Availability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl FilterSet {
    pub fn new() -> Self { Self::default() }

    pub fn with_category(mut self, category: impl Into<String>) -> Self { self.category = Some(category.into()); self }
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self { self.brand = Some(brand.into()); self }
    pub fn with_price_min(mut self, min: f64) -> Self { self.price_min = Some(min); self }
    pub fn with_price_max(mut self, max: f64) -> Self { self.price_max = Some(max); self }
    pub fn with_rating_min(mut self, min: f64) -> Self { self.rating_min = Some(min); self }
    pub fn with_availability(mut self, availability: Availability) -> Self { self.availability = Some(availability); self }
    pub fn with_tags<I, S>(mut self, tags: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Overwrite both price bounds with a named preset. Open-ended presets clear `price_max`.
    pub fn apply_price_range(&mut self, range: &PriceRange) {
        self.price_min = Some(range.min);
        self.price_max = range.max;
    }

    /// Reject bounds the store cannot answer meaningfully.
    pub fn validate(&self) -> Result<()> {
        for (name, bound) in [("price_min", self.price_min), ("price_max", self.price_max)] {
            if let Some(v) = bound {
                if !v.is_finite() || v < 0.0 {
                    return Err(Error::InvalidFilter(format!("{name} must be a non-negative number, got {v}")));
                }
            }
        }
        if let (Some(lo), Some(hi)) = (self.price_min, self.price_max) {
            if lo > hi {
                return Err(Error::InvalidFilter(format!("price_min {lo} exceeds price_max {hi}")));
            }
        }
        if let Some(r) = self.rating_min {
            if !(0.0..=5.0).contains(&r) {
                return Err(Error::InvalidFilter(format!("rating_min must be within [0, 5], got {r}")));
            }
        }
        Ok(())
    }

    /// Evaluate the set as a predicate over one product.
    pub fn matches(&self, product: &Product) -> bool {
        if self.category.as_deref().is_some_and(|c| c != product.category) { return false; }
        if self.brand.as_deref().is_some_and(|b| b != product.brand) { return false; }
        if self.availability.is_some_and(|a| a != product.availability) { return false; }
        if self.price_min.is_some_and(|lo| product.price < lo) { return false; }
        if self.price_max.is_some_and(|hi| product.price > hi) { return false; }
        if self.rating_min.is_some_and(|lo| product.rating < lo) { return false; }
        match self.tags.as_deref() {
            Some(wanted) if !wanted.is_empty() => wanted.iter().any(|t| product.tags.contains(t)),
            _ => true,
        }
    }
}

/// One raw hit from the vector store, before re-ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Store-native similarity, higher is closer.
    pub similarity: f64,
    pub product: Product,
}

/// Itemized contributions behind a final score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub semantic: f64,
    pub rating: f64,
    pub popularity: f64,
    pub title_match: f64,
    pub brand_match: f64,
    pub category_match: f64,
    pub availability_penalty: f64,
}

impl ScoreBreakdown {
    pub fn base(&self) -> f64 { self.semantic + self.rating + self.popularity }

    pub fn boosts(&self) -> f64 { self.title_match + self.brand_match + self.category_match }

    pub fn final_score(&self) -> f64 { (self.base() + self.boosts()) * (1.0 - self.availability_penalty) }
}

/// A re-ranked product returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub product: Product,
    pub semantic_score: f64,
    pub final_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_breakdown: Option<ScoreBreakdown>,
}

/// Why a search produced nothing. Carried inside `SearchOutcome::Failed`
/// instead of being propagated to the caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchFailure {
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("query embedding failed: {0}")]
    Embedding(String),
    #[error("vector store search failed: {0}")]
    Store(String),
}

/// Result of one search call.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(Vec<SearchResult>),
    NoMatches,
    Failed(SearchFailure),
}

impl SearchOutcome {
    /// Ranked results, or an empty slice for `NoMatches` and `Failed`.
    pub fn results(&self) -> &[SearchResult] {
        match self {
            Self::Found(results) => results,
            Self::NoMatches | Self::Failed(_) => &[],
        }
    }

    pub fn into_results(self) -> Vec<SearchResult> {
        match self {
            Self::Found(results) => results,
            Self::NoMatches | Self::Failed(_) => Vec::new(),
        }
    }

    pub fn failure(&self) -> Option<&SearchFailure> {
        match self {
            Self::Failed(f) => Some(f),
            _ => None,
        }
    }
}
