use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use shopsearch_core::catalog::{load_catalog, load_catalog_limited};
use shopsearch_core::config::Config;
use shopsearch_core::traits::VectorStore;
use shopsearch_embed::{get_default_embedder, Embedder};
use shopsearch_hybrid::ProductSearchEngine;
use shopsearch_vector::LanceProductStore;

/// Embed a product catalog and load it into the vector store.
#[derive(Parser)]
#[command(name = "shopsearch-indexer", version, about)]
struct Cli {
    /// JSON array of products.
    #[arg(default_value = "data/products.json")]
    catalog: PathBuf,

    /// Index only the first N products.
    #[arg(long)]
    limit: Option<usize>,

    /// Delete the existing store directory first.
    #[arg(long)]
    recreate: bool,

    /// Query to run once indexing finishes.
    #[arg(long, default_value = "comfortable running shoes")]
    test_query: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shopsearch=info,lancedb=warn")))
        .init();

    let cli = Cli::parse();
    let settings = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?.settings()?;

    println!("Product Catalog Indexer\n=======================");
    println!("Catalog: {}", cli.catalog.display());
    let products = match cli.limit {
        Some(limit) => { println!("🔢 Limiting indexing to {} products", limit); load_catalog_limited(&cli.catalog, limit)? }
        None => load_catalog(&cli.catalog)?,
    };

    let store_path = settings.store.resolved_uri();
    if cli.recreate && store_path.exists() {
        println!("⚠️  Removing existing store at {}", store_path.display());
        fs::remove_dir_all(&store_path)?;
    }
    fs::create_dir_all(&store_path)?;

    let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&settings.embedding)?);
    let info = embedder.model_info();
    println!("Model: {} ({}-d, max {} tokens, batch {})", info.model_name, info.embedding_dimension, info.max_sequence_length, info.batch_size);
    let store = LanceProductStore::from_settings(&settings.store, settings.embedding.dimension)?;
    let engine = ProductSearchEngine::new(store, embedder, &settings);

    let start = Instant::now();
    let indexed = engine.index(&products)?;
    println!("\n✅ Indexed {} products in {:.1}s", indexed, start.elapsed().as_secs_f64());
    println!("📊 Store now holds {} products", engine.store().count()?);

    let results = engine.search_results(&cli.test_query, None, Some(3), false);
    println!("\n🔍 Test search \"{}\": {} results", cli.test_query, results.len());
    for (i, r) in results.iter().enumerate() {
        println!("  {}. {} ({}) score={:.4}", i + 1, r.product.title, r.product.brand, r.final_score);
    }
    println!("\n💡 To search, use: cargo run --bin shopsearch -- search '<query>'");
    Ok(())
}
