//! Multi-factor re-ranking of vector-store candidates.

use shopsearch_core::config::SearchSettings;
use shopsearch_core::types::{Availability, Candidate, ScoreBreakdown, SearchResult};

pub const TITLE_BOOST: f64 = 0.1;
pub const BRAND_BOOST: f64 = 0.05;
pub const CATEGORY_BOOST: f64 = 0.05;

/// Query words this short never earn the title boost.
const MIN_TITLE_WORD_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub semantic: f64,
    pub rating: f64,
    pub popularity: f64,
    pub max_reviews_reference: u64,
}

impl Default for ScoringWeights {
    fn default() -> Self { Self::from(&SearchSettings::default()) }
}

impl From<&SearchSettings> for ScoringWeights {
    fn from(s: &SearchSettings) -> Self {
        Self {
            semantic: s.semantic_weight,
            rating: s.rating_weight,
            popularity: s.popularity_weight,
            max_reviews_reference: s.max_reviews_reference,
        }
    }
}

pub fn availability_multiplier(availability: Availability) -> f64 {
    match availability {
        Availability::InStock | Availability::Unknown => 1.0,
        Availability::LimitedStock => 0.9,
        Availability::OutOfStock => 0.5,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: ScoringWeights,
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights) -> Self { Self { weights } }

    /// Final score of one candidate for `query`, with the itemized breakdown
    /// when `with_breakdown` is set. The score itself never depends on the flag.
    pub fn score(&self, candidate: &Candidate, query: &str, with_breakdown: bool) -> (f64, Option<ScoreBreakdown>) {
        let p = &candidate.product;
        let w = &self.weights;
        let query_lower = query.to_lowercase();
        let title_lower = p.title.to_lowercase();

        let semantic = candidate.similarity * w.semantic;
        let rating = ((p.rating - 1.0) / 4.0) * w.rating;
        // ln(1 + n) / ln(1 + reference); exceeds the weight once n > reference.
        let popularity = (p.num_reviews as f64).ln_1p() / (w.max_reviews_reference as f64).ln_1p() * w.popularity;

        let title_match = if query_lower
            .split_whitespace()
            .any(|word| word.chars().count() >= MIN_TITLE_WORD_CHARS && title_lower.contains(word))
        {
            TITLE_BOOST
        } else {
            0.0
        };
        let brand_match = if contained_in(&p.brand, &query_lower) { BRAND_BOOST } else { 0.0 };
        let category_match = if contained_in(&p.category, &query_lower) { CATEGORY_BOOST } else { 0.0 };

        let multiplier = availability_multiplier(p.availability);
        let final_score = (semantic + rating + popularity + title_match + brand_match + category_match) * multiplier;

        let breakdown = with_breakdown.then(|| ScoreBreakdown {
            semantic,
            rating,
            popularity,
            title_match,
            brand_match,
            category_match,
            availability_penalty: 1.0 - multiplier,
        });
        (final_score, breakdown)
    }

    pub fn score_candidate(&self, candidate: Candidate, query: &str, with_breakdown: bool) -> SearchResult {
        let (final_score, score_breakdown) = self.score(&candidate, query, with_breakdown);
        SearchResult {
            semantic_score: candidate.similarity,
            final_score,
            score_breakdown,
            product: candidate.product,
        }
    }
}

/// Substring test; an empty attribute is contained in every query.
fn contained_in(attribute: &str, query_lower: &str) -> bool {
    query_lower.contains(&attribute.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopsearch_core::types::Product;

    fn candidate(similarity: f64, rating: f64, num_reviews: u64, availability: Availability) -> Candidate {
        Candidate {
            similarity,
            product: Product {
                id: "p1".into(),
                title: "Trail Runner".into(),
                description: String::new(),
                category: "Sports & Outdoors".into(),
                brand: "Nike".into(),
                price: 90.0,
                rating,
                num_reviews,
                availability,
                tags: vec![],
                specifications: Default::default(),
            },
        }
    }

    fn close(a: f64, b: f64) -> bool { (a - b).abs() < 1e-9 }

    #[test]
    fn default_weights_reference_case() {
        let engine = ScoringEngine::default();
        let (score, breakdown) = engine.score(&candidate(0.8, 5.0, 5000, Availability::InStock), "comfy sneakers", true);
        let b = breakdown.expect("breakdown requested");
        assert!(close(b.semantic, 0.56));
        assert!(close(b.rating, 0.2));
        assert!(close(b.popularity, 0.1));
        assert!(close(b.base(), 0.86));
        assert!(close(b.boosts(), 0.0));
        assert!(close(b.availability_penalty, 0.0));
        assert!(close(score, 0.86));
        assert!(close(b.final_score(), score));
    }

    #[test]
    fn availability_scales_the_total() {
        let engine = ScoringEngine::default();
        let (in_stock, _) = engine.score(&candidate(0.8, 5.0, 5000, Availability::InStock), "x", false);
        let (limited, _) = engine.score(&candidate(0.8, 5.0, 5000, Availability::LimitedStock), "x", false);
        let (out, b) = engine.score(&candidate(0.8, 5.0, 5000, Availability::OutOfStock), "x", true);
        let (unknown, _) = engine.score(&candidate(0.8, 5.0, 5000, Availability::Unknown), "x", false);
        assert!(close(limited, in_stock * 0.9));
        assert!(close(out, in_stock * 0.5));
        assert!(close(unknown, in_stock));
        assert!(close(b.map(|b| b.availability_penalty).unwrap_or_default(), 0.5));
    }

    #[test]
    fn lexical_boosts() {
        let engine = ScoringEngine::default();
        let c = candidate(0.5, 3.0, 10, Availability::InStock);
        let (plain, _) = engine.score(&c, "shoes", false);

        let (_, b) = engine.score(&c, "TRAIL shoes", true);
        assert!(close(b.map(|b| b.title_match).unwrap_or_default(), TITLE_BOOST));

        let (_, b) = engine.score(&c, "a trail", true);
        assert!(close(b.map(|b| b.title_match).unwrap_or_default(), TITLE_BOOST));
        let (_, b) = engine.score(&c, "tr ai", true);
        assert!(close(b.map(|b| b.title_match).unwrap_or_default(), 0.0), "words of two chars are ignored");

        let (with_brand, b) = engine.score(&c, "nike shoes", true);
        assert!(close(b.map(|b| b.brand_match).unwrap_or_default(), BRAND_BOOST));
        assert!(close(with_brand - plain, BRAND_BOOST));

        let (_, b) = engine.score(&c, "sports & outdoors gear", true);
        assert!(close(b.map(|b| b.category_match).unwrap_or_default(), CATEGORY_BOOST));
    }

    #[test]
    fn empty_brand_counts_as_mentioned() {
        let engine = ScoringEngine::default();
        let mut c = candidate(0.5, 3.0, 10, Availability::InStock);
        c.product.brand.clear();
        let (_, b) = engine.score(&c, "desk lamp", true);
        assert!(close(b.map(|b| b.brand_match).unwrap_or_default(), BRAND_BOOST));
        assert!(close(b.map(|b| b.category_match).unwrap_or(1.0), 0.0));
    }

    #[test]
    fn breakdown_only_when_requested() {
        let engine = ScoringEngine::default();
        let c = candidate(0.7, 4.2, 300, Availability::LimitedStock);
        let (with, b) = engine.score(&c, "nike trail", true);
        let (without, none) = engine.score(&c, "nike trail", false);
        assert!(b.is_some());
        assert!(none.is_none());
        assert_eq!(with.to_bits(), without.to_bits());

        let result = engine.score_candidate(c, "nike trail", false);
        assert!(result.score_breakdown.is_none());
        assert!(close(result.semantic_score, 0.7));
        assert_eq!(result.final_score.to_bits(), without.to_bits());
    }

    #[test]
    fn popularity_can_exceed_its_weight() {
        let engine = ScoringEngine::default();
        let (_, b) = engine.score(&candidate(0.0, 1.0, 50_000, Availability::InStock), "", true);
        assert!(b.map(|b| b.popularity).unwrap_or_default() > 0.1);
        let (_, b) = engine.score(&candidate(0.0, 1.0, 0, Availability::InStock), "", true);
        assert!(close(b.map(|b| b.popularity).unwrap_or(1.0), 0.0));
    }
}
