//! Query understanding and hybrid re-ranking for product search.

mod engine;
pub mod extract;
pub mod scoring;
pub mod suggest;

pub use engine::ProductSearchEngine;
pub use extract::FilterExtractor;
pub use scoring::{availability_multiplier, ScoringEngine, ScoringWeights};
pub use suggest::{FilterOptions, SuggestionIndex};

pub use shopsearch_core::types::{SearchFailure, SearchOutcome};
