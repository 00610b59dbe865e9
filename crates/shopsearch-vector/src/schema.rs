use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

/// Embedding width of the reference model (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: i32 = 384;

pub fn build_product_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("title", DataType::Utf8, false),
		Field::new("description", DataType::Utf8, false),
		Field::new("category", DataType::Utf8, false),
		Field::new("brand", DataType::Utf8, false),
		Field::new("price", DataType::Float64, false),
		Field::new("rating", DataType::Float64, false),
		Field::new("num_reviews", DataType::UInt64, false),
		Field::new("availability", DataType::Utf8, false),
		Field::new("tags", DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))), false),
		Field::new("specifications", DataType::Utf8, false),
		Field::new("indexed_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}
