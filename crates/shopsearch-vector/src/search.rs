use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, Float64Array, ListArray, RecordBatch, StringArray, UInt64Array};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};
use std::path::Path;
use tokio::runtime::Runtime;
use tracing::debug;

use shopsearch_core::config::StoreSettings;
use shopsearch_core::error::Error;
use shopsearch_core::traits::VectorStore;
use shopsearch_core::types::{Availability, Candidate, FilterSet, Product};
use crate::predicate::to_sql_predicate;
use crate::table::{count_rows, open_db, table_exists};
use crate::writer::upsert_products;

/// LanceDB-backed product store. Owns a runtime so the synchronous
/// `VectorStore` surface can drive the async client.
pub struct LanceProductStore { rt: Runtime, db: Connection, table_name: String, dim: i32, upsert_batch_size: usize }

impl LanceProductStore {
	pub fn open(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
		let rt = Runtime::new()?;
		let db = rt.block_on(open_db(db_path.to_string_lossy().as_ref()))?;
		let dim = i32::try_from(dim).map_err(|_| anyhow!("embedding dimension {} out of range", dim))?;
		Ok(Self { rt, db, table_name: table_name.to_string(), dim, upsert_batch_size: 100 })
	}

	pub fn from_settings(settings: &StoreSettings, dim: usize) -> Result<Self> {
		let mut store = Self::open(&settings.resolved_uri(), &settings.table, dim)?;
		store.upsert_batch_size = settings.upsert_batch_size;
		Ok(store)
	}

	pub async fn search_async(&self, query_vec: &[f32], filter: &FilterSet, limit: usize, min_score: f64) -> Result<Vec<Candidate>> {
		if !table_exists(&self.db, &self.table_name).await? {
			return Err(Error::NotFound(format!("table '{}'", self.table_name)).into());
		}
		let table = self.db.open_table(&self.table_name).execute().await?;
		let mut query = table.vector_search(query_vec.to_vec())?.distance_type(DistanceType::Cosine).limit(limit);
		if let Some(predicate) = to_sql_predicate(filter) {
			debug!(%predicate, "filtered vector search");
			query = query.only_if(predicate);
		}
		let mut stream = query.execute().await?;
		let mut candidates = Vec::new();
		while let Some(batch) = stream.try_next().await? {
			candidates.extend(batch_to_candidates(&batch)?);
		}
		candidates.retain(|c| c.similarity >= min_score);
		Ok(candidates)
	}
}

impl VectorStore for LanceProductStore {
	fn upsert(&self, products: &[Product], embeddings: &[Vec<f32>]) -> Result<()> {
		self.rt.block_on(upsert_products(&self.db, &self.table_name, self.dim, products, embeddings, self.upsert_batch_size))
	}

	fn search(&self, query_vec: &[f32], filter: &FilterSet, limit: usize, min_score: f64) -> Result<Vec<Candidate>> {
		self.rt.block_on(self.search_async(query_vec, filter, limit, min_score))
	}

	fn count(&self) -> Result<usize> {
		self.rt.block_on(count_rows(&self.db, &self.table_name))
	}
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| Error::Store(format!("column '{}' missing or mistyped", name)).into())
}

fn batch_to_candidates(batch: &RecordBatch) -> Result<Vec<Candidate>> {
	let ids = column::<StringArray>(batch, "id")?;
	let titles = column::<StringArray>(batch, "title")?;
	let descriptions = column::<StringArray>(batch, "description")?;
	let categories = column::<StringArray>(batch, "category")?;
	let brands = column::<StringArray>(batch, "brand")?;
	let prices = column::<Float64Array>(batch, "price")?;
	let ratings = column::<Float64Array>(batch, "rating")?;
	let reviews = column::<UInt64Array>(batch, "num_reviews")?;
	let availability = column::<StringArray>(batch, "availability")?;
	let tags = column::<ListArray>(batch, "tags")?;
	let specs = column::<StringArray>(batch, "specifications")?;
	let distances = column::<Float32Array>(batch, "_distance")?;

	let mut out = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		let tag_values = tags.value(i);
		let tag_strings = tag_values
			.as_any()
			.downcast_ref::<StringArray>()
			.ok_or_else(|| Error::Store("tags items are not strings".into()))?;
		let product = Product {
			id: ids.value(i).to_string(),
			title: titles.value(i).to_string(),
			description: descriptions.value(i).to_string(),
			category: categories.value(i).to_string(),
			brand: brands.value(i).to_string(),
			price: prices.value(i),
			rating: ratings.value(i),
			num_reviews: reviews.value(i),
			availability: Availability::parse(availability.value(i)),
			tags: tag_strings.iter().flatten().map(str::to_string).collect(),
			specifications: serde_json::from_str(specs.value(i)).unwrap_or_default(),
		};
		// Cosine distance is 1 - cosine similarity.
		out.push(Candidate { similarity: 1.0 - f64::from(distances.value(i)), product });
	}
	Ok(out)
}
