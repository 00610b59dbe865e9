use anyhow::{ensure, Result};
use arrow_array::builder::{ListBuilder, StringBuilder};
use arrow_array::{FixedSizeListArray, Float64Array, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray, UInt64Array};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use std::sync::Arc;
use tracing::info;

use shopsearch_core::types::Product;
use crate::schema::build_product_schema;
use crate::table::ensure_table;

/// Merge `products` into `table` keyed by `id`, `batch_size` rows per write.
pub async fn upsert_products(conn: &Connection, table: &str, dim: i32, products: &[Product], embeddings: &[Vec<f32>], batch_size: usize) -> Result<()> {
	ensure!(products.len() == embeddings.len(), "products and embeddings length must match ({} vs {})", products.len(), embeddings.len());
	if products.is_empty() { info!("no products to index"); return Ok(()); }
	if let Some((i, v)) = embeddings.iter().enumerate().find(|(_, v)| v.len() != dim as usize) {
		anyhow::bail!("embedding {} has dimension {} but the table expects {}", i, v.len(), dim);
	}
	ensure_table(conn, table, build_product_schema(dim)).await?;
	let t = conn.open_table(table).execute().await?;

	info!(count = products.len(), table, "upserting products");
	let pb = ProgressBar::new(products.len() as u64);
	pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} products ({percent}%) {msg}")?.progress_chars("#>-"));
	let batch_size = batch_size.max(1);
	for (chunk, vectors) in products.chunks(batch_size).zip(embeddings.chunks(batch_size)) {
		let batch = products_to_record_batch(chunk, vectors, dim)?;
		let schema = batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
		let mut mi = t.merge_insert(&["id"]);
		mi.when_matched_update_all(None).when_not_matched_insert_all();
		mi.execute(reader).await?;
		pb.inc(chunk.len() as u64);
	}
	pb.finish_with_message("done");
	info!(count = products.len(), table, "upsert complete");
	Ok(())
}

pub fn products_to_record_batch(products: &[Product], embeddings: &[Vec<f32>], dim: i32) -> Result<RecordBatch> {
	let now = Utc::now().timestamp_millis();
	let mut tags = ListBuilder::new(StringBuilder::new());
	for p in products {
		for tag in &p.tags { tags.values().append_value(tag); }
		tags.append(true);
	}
	let specifications = products.iter().map(|p| serde_json::to_string(&p.specifications)).collect::<Result<Vec<_>, _>>()?;
	let vectors = embeddings.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
	let batch = RecordBatch::try_new(build_product_schema(dim), vec![
		Arc::new(StringArray::from_iter_values(products.iter().map(|p| p.id.as_str()))),
		Arc::new(StringArray::from_iter_values(products.iter().map(|p| p.title.as_str()))),
		Arc::new(StringArray::from_iter_values(products.iter().map(|p| p.description.as_str()))),
		Arc::new(StringArray::from_iter_values(products.iter().map(|p| p.category.as_str()))),
		Arc::new(StringArray::from_iter_values(products.iter().map(|p| p.brand.as_str()))),
		Arc::new(Float64Array::from_iter_values(products.iter().map(|p| p.price))),
		Arc::new(Float64Array::from_iter_values(products.iter().map(|p| p.rating))),
		Arc::new(UInt64Array::from_iter_values(products.iter().map(|p| p.num_reviews))),
		Arc::new(StringArray::from_iter_values(products.iter().map(|p| p.availability.as_str()))),
		Arc::new(tags.finish()),
		Arc::new(StringArray::from(specifications)),
		Arc::new(TimestampMillisecondArray::from(vec![now; products.len()])),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim)),
	])?;
	ensure!(batch.num_rows() == products.len(), "record batch row count mismatch");
	Ok(batch)
}
