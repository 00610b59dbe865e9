//! Catalog loading: a JSON array of products as written by the catalog generator.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::types::Product;

pub fn load_catalog(path: &Path) -> Result<Vec<Product>> {
    let raw = fs::read_to_string(path).map_err(|e| Error::Catalog(format!("Failed to read {}: {}", path.display(), e)))?;
    let products: Vec<Product> =
        serde_json::from_str(&raw).map_err(|e| Error::Catalog(format!("Failed to parse {}: {}", path.display(), e)))?;
    if let Some(dup) = first_duplicate_id(&products) {
        return Err(Error::Catalog(format!("duplicate product id '{}' in {}", dup, path.display())));
    }
    info!(count = products.len(), path = %path.display(), "loaded catalog");
    Ok(products)
}

pub fn load_catalog_limited(path: &Path, limit: usize) -> Result<Vec<Product>> {
    let mut products = load_catalog(path)?;
    if products.len() > limit {
        products.truncate(limit);
        info!(limit, "catalog limited");
    }
    Ok(products)
}

fn first_duplicate_id(products: &[Product]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    products.iter().map(|p| p.id.as_str()).find(|id| !seen.insert(*id))
}
