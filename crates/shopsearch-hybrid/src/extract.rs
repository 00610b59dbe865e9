//! Implicit filter extraction from free-text queries.
//!
//! Each filter family (price, rating, category, brand) is an ordered list of
//! rules evaluated against the lowercased query; the first rule that matches
//! decides that family and the rest are not evaluated. Extracted values never
//! replace a key the caller already set; for price, a caller bound on either
//! side suppresses price extraction entirely.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use shopsearch_core::types::FilterSet;

#[derive(Clone, Copy)]
enum PriceRule {
    Max,
    Min,
    Between,
}

const NUM: &str = r"\$?(\d+(?:\.\d+)?)";

static PRICE_RULES: LazyLock<Vec<(Regex, PriceRule)>> = LazyLock::new(|| {
    [
        (format!(r"\bunder {NUM}"), PriceRule::Max),
        (format!(r"\bbelow {NUM}"), PriceRule::Max),
        (format!(r"\bless than {NUM}"), PriceRule::Max),
        (format!(r"\bover {NUM}"), PriceRule::Min),
        (format!(r"\babove {NUM}"), PriceRule::Min),
        (format!(r"\bmore than {NUM}"), PriceRule::Min),
        (format!(r"{NUM}\s*-\s*{NUM}"), PriceRule::Between),
        (format!(r"\bbetween {NUM} and {NUM}"), PriceRule::Between),
    ]
    .into_iter()
    .map(|(pattern, rule)| (Regex::new(&pattern).expect("valid regex"), rule))
    .collect()
});

#[derive(Clone, Copy)]
enum RatingRule {
    Captured,
    Fixed(f64),
}

static RATING_RULES: LazyLock<Vec<(Regex, RatingRule)>> = LazyLock::new(|| {
    [
        (r"(\d+(?:\.\d+)?)\+ stars?\b", RatingRule::Captured),
        (r"(\d+(?:\.\d+)?) stars? or better\b", RatingRule::Captured),
        (r"\bhighly[- ]rated\b", RatingRule::Fixed(4.0)),
        (r"\btop[- ]rated\b", RatingRule::Fixed(4.5)),
    ]
    .into_iter()
    .map(|(pattern, rule)| (Regex::new(pattern).expect("valid regex"), rule))
    .collect()
});

/// Keyword → category, scanned in declared order. Sports keywords precede
/// clothing keywords so "running shoes" resolves to Sports & Outdoors.
pub const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("laptop", "Electronics"),
    ("computer", "Electronics"),
    ("headphones", "Electronics"),
    ("phone", "Electronics"),
    ("camera", "Electronics"),
    ("running", "Sports & Outdoors"),
    ("fitness", "Sports & Outdoors"),
    ("outdoor", "Sports & Outdoors"),
    ("camping", "Sports & Outdoors"),
    ("shirt", "Clothing & Accessories"),
    ("shoes", "Clothing & Accessories"),
    ("dress", "Clothing & Accessories"),
    ("jacket", "Clothing & Accessories"),
    ("furniture", "Home & Garden"),
    ("kitchen", "Home & Garden"),
    ("garden", "Home & Garden"),
    ("decor", "Home & Garden"),
];

pub const KNOWN_BRANDS: &[&str] = &[
    "apple", "samsung", "sony", "nike", "adidas", "canon", "dell", "hp",
    "lenovo", "bose", "calvin klein", "coach", "under armour", "patagonia",
];

/// Pure text → `FilterSet` extraction; holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterExtractor;

impl FilterExtractor {
    pub fn new() -> Self { Self }

    /// `existing` plus whatever the query implies for keys `existing` leaves unset.
    pub fn extract(&self, query: &str, existing: &FilterSet) -> FilterSet {
        let mut filters = existing.clone();
        let text = query.to_lowercase();

        // Price bounds are one family: either caller bound blocks both.
        if filters.price_min.is_none() && filters.price_max.is_none() {
            if let Some((min, max)) = extract_price(&text) {
                filters.price_min = min;
                filters.price_max = max;
            }
        }
        if filters.rating_min.is_none() {
            filters.rating_min = extract_rating(&text);
        }
        if filters.category.is_none() {
            filters.category = CATEGORY_KEYWORDS.iter().find(|(kw, _)| text.contains(kw)).map(|(_, c)| (*c).to_string());
        }
        if filters.brand.is_none() {
            filters.brand = KNOWN_BRANDS.iter().find(|b| text.contains(*b)).map(|b| title_case(b));
        }
        filters
    }
}

fn extract_price(text: &str) -> Option<(Option<f64>, Option<f64>)> {
    let (caps, rule) = PRICE_RULES.iter().find_map(|(re, rule)| re.captures(text).map(|c| (c, *rule)))?;
    let n = |caps: &Captures, i: usize| caps.get(i).and_then(|m| m.as_str().parse::<f64>().ok());
    Some(match rule {
        PriceRule::Max => (None, n(&caps, 1)),
        PriceRule::Min => (n(&caps, 1), None),
        PriceRule::Between => (n(&caps, 1), n(&caps, 2)),
    })
}

/// Ratings outside [0, 5] are ignored rather than turned into an unsatisfiable filter.
fn extract_rating(text: &str) -> Option<f64> {
    let (caps, rule) = RATING_RULES.iter().find_map(|(re, rule)| re.captures(text).map(|c| (c, *rule)))?;
    let value = match rule {
        RatingRule::Fixed(v) => Some(v),
        RatingRule::Captured => caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()),
    };
    value.filter(|v| (0.0..=5.0).contains(v))
}

/// "under armour" → "Under Armour".
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if at_word_start { out.extend(ch.to_uppercase()); } else { out.extend(ch.to_lowercase()); }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
