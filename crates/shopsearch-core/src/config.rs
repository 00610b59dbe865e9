//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`, `config.<env>.toml`
//! and `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_SEARCH__DEFAULT_LIMIT=20`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    /// Layer `config.toml`, then `config.<env>.toml`, then `APP_*` variables
    /// found in `dir` over the built-in defaults.
    pub fn load_from(dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed view of the merged configuration, validated.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub search: SearchSettings,
    pub embedding: EmbeddingSettings,
    pub store: StoreSettings,
    pub catalog: CatalogSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        let s = &self.search;
        if s.default_limit == 0 {
            return Err(Error::InvalidConfig("search.default_limit must be positive".into()));
        }
        for (name, w) in [("semantic_weight", s.semantic_weight), ("rating_weight", s.rating_weight), ("popularity_weight", s.popularity_weight)] {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::InvalidConfig(format!("search.{name} must be a non-negative number, got {w}")));
            }
        }
        if s.max_reviews_reference == 0 {
            return Err(Error::InvalidConfig("search.max_reviews_reference must be positive".into()));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be positive".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be positive".into()));
        }
        for range in &self.catalog.price_ranges {
            if range.max.is_some_and(|max| max < range.min) {
                return Err(Error::InvalidConfig(format!("price range '{}' has min above max", range.label)));
            }
        }
        Ok(())
    }
}

/// Re-ranking weights and retrieval limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_limit: usize,
    pub similarity_threshold: f64,
    pub semantic_weight: f64,
    pub rating_weight: f64,
    pub popularity_weight: f64,
    /// Review count that maps to a popularity of exactly 1.0. A calibration
    /// constant, not derived from the catalog.
    pub max_reviews_reference: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_limit: 15,
            similarity_threshold: 0.3,
            semantic_weight: 0.7,
            rating_weight: 0.2,
            popularity_weight: 0.1,
            max_reviews_reference: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<String>,
    pub model_name: String,
    pub dimension: usize,
    /// Upper bound on product text characters and on model tokens.
    pub max_length: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { model_dir: None, model_name: "all-MiniLM-L6-v2".to_string(), dimension: 384, max_length: 512, batch_size: 32 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub uri: String,
    pub table: String,
    pub upsert_batch_size: usize,
}

impl StoreSettings {
    pub fn resolved_uri(&self) -> PathBuf { expand_path(&self.uri) }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { uri: "data/lancedb".to_string(), table: "products".to_string(), upsert_batch_size: 100 }
    }
}

/// A named price band offered as a preset filter. `max: None` means no upper bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub label: String,
    pub min: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn new(label: &str, min: f64, max: Option<f64>) -> Self { Self { label: label.to_string(), min, max } }
}

/// Static vocabulary used for suggestions and filter widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub sample_queries: Vec<String>,
    pub categories: Vec<String>,
    pub price_ranges: Vec<PriceRange>,
}

impl CatalogSettings {
    pub fn price_range(&self, label: &str) -> Option<&PriceRange> {
        self.price_ranges.iter().find(|r| r.label.eq_ignore_ascii_case(label))
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        let strings = |xs: &[&str]| xs.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        Self {
            sample_queries: strings(&[
                "comfortable running shoes",
                "wireless noise canceling headphones",
                "gaming laptop under $1000",
                "waterproof bluetooth speaker",
                "ergonomic office chair",
                "4K webcam for streaming",
                "portable power bank",
                "fitness tracker with GPS",
            ]),
            categories: strings(&[
                "Electronics",
                "Clothing & Accessories",
                "Sports & Outdoors",
                "Home & Garden",
                "Books",
                "Beauty & Personal Care",
                "Toys & Games",
                "Automotive",
            ]),
            price_ranges: vec![
                PriceRange::new("budget", 0.0, Some(50.0)),
                PriceRange::new("mid-range", 50.0, Some(200.0)),
                PriceRange::new("premium", 200.0, Some(500.0)),
                PriceRange::new("luxury", 500.0, None),
            ],
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
