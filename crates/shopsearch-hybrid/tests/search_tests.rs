use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use shopsearch_core::config::Settings;
use shopsearch_core::traits::{Embedder, VectorStore};
use shopsearch_core::types::{Availability, Candidate, FilterSet, Product};
use shopsearch_embed::FakeEmbedder;
use shopsearch_hybrid::{ProductSearchEngine, SearchFailure, SearchOutcome};
use shopsearch_vector::MemoryStore;

fn product(id: &str, title: &str, category: &str, brand: &str, price: f64, rating: f64, availability: Availability) -> Product {
    Product {
        id: id.to_string(),
        title: title.to_string(),
        description: format!("{title} by {brand}"),
        category: category.to_string(),
        brand: brand.to_string(),
        price,
        rating,
        num_reviews: 100,
        availability,
        tags: vec![],
        specifications: Default::default(),
    }
}

/// Returns a fixed vector, or fails, and counts calls.
struct StubEmbedder {
    dim: usize,
    fail: bool,
    calls: Mutex<usize>,
}

impl StubEmbedder {
    fn ok(dim: usize) -> Self { Self { dim, fail: false, calls: Mutex::new(0) } }
    fn failing() -> Self { Self { dim: 4, fail: true, calls: Mutex::new(0) } }
}

impl Embedder for StubEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { 512 }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(anyhow!("model unavailable"));
        }
        Ok(texts.iter().map(|_| vec![0.5; self.dim]).collect())
    }
}

/// Serves canned candidates in the given order and records each request.
#[derive(Default)]
struct StubStore {
    candidates: Vec<Candidate>,
    fail: bool,
    requests: Mutex<Vec<(FilterSet, usize, f64)>>,
}

impl StubStore {
    fn with(candidates: Vec<Candidate>) -> Self { Self { candidates, ..Default::default() } }
    fn last_request(&self) -> Option<(FilterSet, usize, f64)> { self.requests.lock().unwrap().last().cloned() }
}

impl VectorStore for StubStore {
    fn upsert(&self, _products: &[Product], _embeddings: &[Vec<f32>]) -> Result<()> { Ok(()) }
    fn search(&self, _query_vec: &[f32], filter: &FilterSet, limit: usize, min_score: f64) -> Result<Vec<Candidate>> {
        self.requests.lock().unwrap().push((filter.clone(), limit, min_score));
        if self.fail {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.candidates.iter().take(limit).cloned().collect())
    }
    fn count(&self) -> Result<usize> { Ok(self.candidates.len()) }
}

fn engine<S: VectorStore>(store: S, embedder: Arc<dyn Embedder>) -> ProductSearchEngine<S> {
    ProductSearchEngine::new(store, embedder, &Settings::default())
}

fn candidate(similarity: f64, p: Product) -> Candidate { Candidate { similarity, product: p } }

#[test]
fn reranks_by_final_score() {
    let store = StubStore::with(vec![
        candidate(0.9, product("oos", "Desk Lamp", "Home & Garden", "Ikea", 30.0, 4.0, Availability::OutOfStock)),
        candidate(0.6, product("ok", "Desk Lamp", "Home & Garden", "Ikea", 30.0, 4.0, Availability::InStock)),
    ]);
    let engine = engine(store, Arc::new(StubEmbedder::ok(4)));
    let results = engine.search_results("lamp", None, Some(10), false);
    assert_eq!(results.iter().map(|r| r.product.id.as_str()).collect::<Vec<_>>(), vec!["ok", "oos"]);
    assert!(results.windows(2).all(|w| w[0].final_score >= w[1].final_score));
    assert!((results[1].semantic_score - 0.9).abs() < 1e-12, "raw similarity is preserved");
}

#[test]
fn equal_scores_keep_store_order() {
    let twins: Vec<Candidate> = ["a", "b", "c"]
        .iter()
        .map(|id| candidate(0.7, product(id, "Mug", "Home & Garden", "Acme", 10.0, 4.0, Availability::InStock)))
        .collect();
    let engine = engine(StubStore::with(twins), Arc::new(StubEmbedder::ok(4)));
    let ids: Vec<String> = engine.search_results("mug", None, Some(3), false).into_iter().map(|r| r.product.id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn overfetches_twice_the_limit_and_truncates() {
    let many: Vec<Candidate> = (0..30)
        .map(|i| candidate(0.3 + f64::from(i) * 0.01, product(&format!("p{i}"), "Thing", "Toys & Games", "Acme", 5.0, 3.0, Availability::InStock)))
        .collect();
    let store = Arc::new(StubStore::with(many));
    let engine = engine(Arc::clone(&store), Arc::new(StubEmbedder::ok(4)));

    let outcome = engine.search("thing", None, Some(5), false);
    assert_eq!(outcome.results().len(), 5);
    let (_, requested, min_score) = store.last_request().expect("store called");
    assert_eq!(requested, 10);
    assert!((min_score - 0.3).abs() < 1e-12);

    let outcome = engine.search("thing", None, None, false);
    assert_eq!(outcome.results().len(), 15, "default limit");
    assert_eq!(store.last_request().map(|r| r.1), Some(30));
}

#[test]
fn extracted_filters_reach_the_store_without_overriding_explicit_ones() {
    let store = Arc::new(StubStore::default());
    let engine = engine(Arc::clone(&store), Arc::new(StubEmbedder::ok(4)));
    let explicit = FilterSet::new().with_brand("Adidas");
    let outcome = engine.search("nike running shoes under $50", Some(&explicit), Some(5), false);
    assert_eq!(outcome, SearchOutcome::NoMatches);

    let (filters, _, _) = store.last_request().expect("store called");
    assert_eq!(filters.brand.as_deref(), Some("Adidas"));
    assert_eq!(filters.price_max, Some(50.0));
    assert_eq!(filters.category.as_deref(), Some("Sports & Outdoors"));
}

#[test]
fn explicit_price_bound_is_not_contradicted_by_query_range() {
    let store = Arc::new(StubStore::with(vec![candidate(0.8, product("s1", "Trail Running Shoes", "Sports & Outdoors", "Nike", 25.0, 4.5, Availability::InStock))]));
    let engine = engine(Arc::clone(&store), Arc::new(StubEmbedder::ok(4)));
    let explicit = FilterSet::new().with_price_max(30.0);
    let outcome = engine.search("running shoes $50-$90", Some(&explicit), Some(5), false);
    assert!(outcome.failure().is_none());
    assert_eq!(outcome.results().len(), 1);

    let (filters, _, _) = store.last_request().expect("store called");
    assert_eq!((filters.price_min, filters.price_max), (None, Some(30.0)));
}

#[test]
fn embedding_failure_yields_empty_results() {
    let store = Arc::new(StubStore::with(vec![candidate(0.9, product("x", "Mug", "Home & Garden", "Acme", 10.0, 4.0, Availability::InStock))]));
    let engine = engine(Arc::clone(&store), Arc::new(StubEmbedder::failing()));
    let outcome = engine.search("mug", None, Some(5), false);
    assert!(matches!(outcome, SearchOutcome::Failed(SearchFailure::Embedding(_))));
    assert!(outcome.into_results().is_empty());
    assert!(store.last_request().is_none(), "store never queried");
}

#[test]
fn wrong_dimension_query_vector_is_an_embedding_failure() {
    struct Short;
    impl Embedder for Short {
        fn dim(&self) -> usize { 8 }
        fn max_len(&self) -> usize { 512 }
        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|_| vec![1.0; 3]).collect()) }
    }
    let engine = engine(StubStore::default(), Arc::new(Short));
    assert!(matches!(engine.search("mug", None, None, false), SearchOutcome::Failed(SearchFailure::Embedding(_))));
}

#[test]
fn store_failure_and_empty_store() {
    let failing = StubStore { fail: true, ..Default::default() };
    let outcome = engine(failing, Arc::new(StubEmbedder::ok(4))).search("mug", None, Some(5), false);
    assert!(matches!(outcome.failure(), Some(SearchFailure::Store(_))));
    assert!(outcome.results().is_empty());

    let outcome = engine(StubStore::default(), Arc::new(StubEmbedder::ok(4))).search("mug", None, Some(5), false);
    assert_eq!(outcome, SearchOutcome::NoMatches);
}

#[test]
fn invalid_filters_fail_before_any_collaborator_call() {
    let store = Arc::new(StubStore::default());
    let embedder = Arc::new(StubEmbedder::ok(4));
    let engine = engine(Arc::clone(&store), embedder.clone());
    let bad = FilterSet::new().with_price_min(100.0).with_price_max(10.0);
    let outcome = engine.search("mug", Some(&bad), Some(5), false);
    assert!(matches!(outcome, SearchOutcome::Failed(SearchFailure::InvalidFilter(_))));
    assert_eq!(*embedder.calls.lock().unwrap(), 0);
    assert!(store.last_request().is_none());
}

#[test]
fn zero_limit_returns_nothing() {
    let store = Arc::new(StubStore::with(vec![candidate(0.9, product("x", "Mug", "Home & Garden", "Acme", 10.0, 4.0, Availability::InStock))]));
    let engine = engine(Arc::clone(&store), Arc::new(StubEmbedder::ok(4)));
    assert_eq!(engine.search("mug", None, Some(0), false), SearchOutcome::NoMatches);
}

#[test]
fn breakdown_is_optional_and_consistent() {
    let store = StubStore::with(vec![candidate(0.8, product("s1", "Trail Running Shoes", "Sports & Outdoors", "Nike", 80.0, 5.0, Availability::LimitedStock))]);
    let engine = engine(store, Arc::new(StubEmbedder::ok(4)));
    let with = engine.search_results("nike trail", None, Some(1), true);
    let without = engine.search_results("nike trail", None, Some(1), false);
    let b = with[0].score_breakdown.expect("breakdown");
    assert!(without[0].score_breakdown.is_none());
    assert!((b.final_score() - with[0].final_score).abs() < 1e-12);
    assert!((with[0].final_score - without[0].final_score).abs() < 1e-12);
    assert!((b.availability_penalty - 0.1).abs() < 1e-12);
}

#[test]
fn index_then_search_with_fake_embeddings() {
    let products = vec![
        product("e1", "Wireless Noise Cancelling Headphones", "Electronics", "Sony", 249.0, 4.7, Availability::InStock),
        product("s1", "Comfortable Running Shoes", "Sports & Outdoors", "Nike", 45.0, 4.5, Availability::InStock),
        product("s2", "Running Shoes Pro", "Sports & Outdoors", "Adidas", 140.0, 4.8, Availability::InStock),
        product("h1", "Oak Kitchen Table", "Home & Garden", "Ikea", 320.0, 4.1, Availability::LimitedStock),
    ];
    let mut settings = Settings::default();
    settings.search.similarity_threshold = -1.0;
    let engine = ProductSearchEngine::new(MemoryStore::new(64), Arc::new(FakeEmbedder::new(64)), &settings);
    assert_eq!(engine.index(&products).expect("index"), 4);
    assert_eq!(engine.store().count().expect("count"), 4);

    let results = engine.search_results("comfortable running shoes under $50", None, Some(5), true);
    assert_eq!(results.iter().map(|r| r.product.id.as_str()).collect::<Vec<_>>(), vec!["s1"]);
    assert!(results[0].score_breakdown.map(|b| b.title_match).unwrap_or_default() > 0.0);
}
