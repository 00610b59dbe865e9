//! Translation of a `FilterSet` into a LanceDB (DataFusion SQL) filter.
//!
//! `category`, `brand` and `availability` become equality conditions,
//! `price_min`/`price_max` an inclusive range on `price` (a missing bound is
//! omitted, never replaced by an infinity sentinel), `rating_min` a lower bound
//! on `rating`, and `tags` an any-of match on the `tags` list column.

use shopsearch_core::types::FilterSet;

pub fn to_sql_predicate(filter: &FilterSet) -> Option<String> {
	let mut conditions = Vec::new();
	if let Some(category) = &filter.category { conditions.push(format!("category = {}", quote(category))); }
	if let Some(brand) = &filter.brand { conditions.push(format!("brand = {}", quote(brand))); }
	if let Some(lo) = filter.price_min { conditions.push(format!("price >= {}", number(lo))); }
	if let Some(hi) = filter.price_max { conditions.push(format!("price <= {}", number(hi))); }
	if let Some(lo) = filter.rating_min { conditions.push(format!("rating >= {}", number(lo))); }
	if let Some(availability) = filter.availability { conditions.push(format!("availability = {}", quote(availability.as_str()))); }
	if let Some(tags) = filter.tags.as_deref().filter(|t| !t.is_empty()) {
		let list = tags.iter().map(|t| quote(t)).collect::<Vec<_>>().join(", ");
		conditions.push(format!("array_has_any(tags, make_array({list}))"));
	}
	if conditions.is_empty() { None } else { Some(conditions.join(" AND ")) }
}

fn quote(s: &str) -> String { format!("'{}'", s.replace('\'', "''")) }

fn number(v: f64) -> String {
	if v.fract() == 0.0 { format!("{v:.1}") } else { v.to_string() }
}
