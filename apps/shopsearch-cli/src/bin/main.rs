use std::sync::Arc;

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shopsearch_core::config::{Config, Settings};
use shopsearch_core::types::{Availability, FilterSet};
use shopsearch_embed::{get_default_embedder, Embedder};
use shopsearch_hybrid::{ProductSearchEngine, SuggestionIndex};
use shopsearch_vector::LanceProductStore;

/// Product search over an indexed catalog.
#[derive(Parser)]
#[command(name = "shopsearch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rank products for a free-text query.
    Search(SearchArgs),

    /// Complete a partial query from the sample vocabulary.
    Suggest {
        partial: String,
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// Print the selectable filter values as JSON.
    Filters,
}

#[derive(Args)]
struct SearchArgs {
    query: String,
    #[arg(short, long)]
    limit: Option<usize>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    brand: Option<String>,
    #[arg(long)]
    price_min: Option<f64>,
    #[arg(long)]
    price_max: Option<f64>,
    /// Named preset such as "budget" or "luxury"; overrides --price-min/--price-max.
    #[arg(long)]
    price_range: Option<String>,
    #[arg(long)]
    rating_min: Option<f64>,
    /// "In Stock", "Limited Stock" or "Out of Stock".
    #[arg(long)]
    availability: Option<String>,
    /// Match products carrying any of these tags.
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Show the score breakdown for each result.
    #[arg(long)]
    explain: bool,
    /// Print results as JSON.
    #[arg(long)]
    json: bool,
}

impl SearchArgs {
    fn filters(&self, settings: &Settings) -> anyhow::Result<FilterSet> {
        let mut f = FilterSet {
            category: self.category.clone(),
            brand: self.brand.clone(),
            price_min: self.price_min,
            price_max: self.price_max,
            rating_min: self.rating_min,
            availability: None,
            tags: (!self.tags.is_empty()).then(|| self.tags.clone()),
        };
        if let Some(label) = &self.availability {
            match Availability::parse(label) {
                Availability::Unknown => return Err(anyhow!("unknown availability '{}'", label)),
                a => f.availability = Some(a),
            }
        }
        if let Some(label) = &self.price_range {
            let range = settings.catalog.price_range(label).ok_or_else(|| anyhow!("unknown price range '{}'", label))?;
            f.apply_price_range(range);
        }
        Ok(f)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shopsearch=info,lancedb=warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?.settings()?;

    match cli.command {
        Command::Search(args) => run_search(&settings, &args),
        Command::Suggest { partial, limit } => {
            for s in SuggestionIndex::new(&settings.catalog).suggest(&partial, limit) {
                println!("{s}");
            }
            Ok(())
        }
        Command::Filters => {
            let options = SuggestionIndex::new(&settings.catalog).filter_options();
            println!("{}", serde_json::to_string_pretty(&options)?);
            Ok(())
        }
    }
}

fn run_search(settings: &Settings, args: &SearchArgs) -> anyhow::Result<()> {
    let filters = args.filters(settings)?;
    let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&settings.embedding)?);
    let store = LanceProductStore::from_settings(&settings.store, settings.embedding.dimension)?;
    let engine = ProductSearchEngine::new(store, embedder, settings);

    let outcome = engine.search(&args.query, Some(&filters), args.limit, args.explain);
    if let Some(failure) = outcome.failure() {
        eprintln!("⚠️  Search failed: {failure}");
    }
    let results = outcome.into_results();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!("🔍 Found {} results for: \"{}\"", results.len(), args.query);
    for (i, r) in results.iter().enumerate() {
        let p = &r.product;
        println!("\n  {}. {}  [{}]", i + 1, p.title, p.id);
        println!("     {} | {} | ${:.2} | {:.1}★ ({} reviews) | {}", p.brand, p.category, p.price, p.rating, p.num_reviews, p.availability);
        println!("     score={:.4}  semantic={:.4}", r.final_score, r.semantic_score);
        if let Some(b) = &r.score_breakdown {
            println!(
                "     semantic={:.3} rating={:.3} popularity={:.3} title={:.2} brand={:.2} category={:.2} penalty={:.2}",
                b.semantic, b.rating, b.popularity, b.title_match, b.brand_match, b.category_match, b.availability_penalty
            );
        }
    }
    Ok(())
}
