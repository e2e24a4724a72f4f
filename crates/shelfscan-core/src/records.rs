use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stock-status fragments that mark a record as not purchasable.
/// Matched as case-insensitive substrings.
const UNAVAILABLE_MARKERS: [&str; 2] = ["out of stock", "unavailable"];

/// One product card as extracted from a search-results page, before any
/// validation. Every field is best-effort: a selector miss leaves it absent
/// rather than failing the card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCapture {
    /// Marketplace item code (uppercase, 10 characters when present).
    /// Read from the card's `data-asin` attribute, or recovered from the
    /// product URL when the attribute is missing.
    pub item_id: Option<String>,
    pub title: Option<String>,
    /// Absolute product URL with the query string stripped.
    pub url: Option<String>,
    /// Selling price in the region's major currency unit.
    pub current_price: Option<f64>,
    /// Strikethrough/reference price, when the card shows one.
    pub list_price: Option<f64>,
    /// Percentage off the list price; computed when both prices are known,
    /// otherwise parsed from an explicit discount badge.
    pub discount_percent: Option<f64>,
    /// Star rating on a 0–5 scale.
    pub rating: Option<f64>,
    pub review_count: Option<u64>,
    /// Free-text availability, e.g. `"Available"` or `"Only 2 left in stock"`.
    pub stock_status: Option<String>,
    /// Best-effort attributes pattern-matched from the card text,
    /// e.g. `ram`, `storage`, `color`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variants: BTreeMap<String, String>,
    pub scraped_at: DateTime<Utc>,
}

impl RawCapture {
    /// Returns an empty capture stamped with the given time. Extraction fills
    /// in whatever the card yields.
    #[must_use]
    pub fn at(scraped_at: DateTime<Utc>) -> Self {
        Self {
            item_id: None,
            title: None,
            url: None,
            current_price: None,
            list_price: None,
            discount_percent: None,
            rating: None,
            review_count: None,
            stock_status: None,
            variants: BTreeMap::new(),
            scraped_at,
        }
    }

    /// Returns `true` if the stock text marks the product as not purchasable.
    /// Absent stock text counts as available.
    #[must_use]
    pub fn is_marked_unavailable(&self) -> bool {
        self.stock_status
            .as_deref()
            .is_some_and(stock_text_unavailable)
    }
}

/// A validated, type-coerced product record. Produced from a [`RawCapture`]
/// by the normalization stage; `title`, `url`, and `current_price` are
/// guaranteed present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub item_id: Option<String>,
    pub title: String,
    pub url: String,
    pub current_price: f64,
    pub list_price: Option<f64>,
    pub discount_percent: Option<f64>,
    pub rating: Option<f64>,
    pub review_count: Option<u64>,
    pub stock_status: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variants: BTreeMap<String, String>,
    pub scraped_at: DateTime<Utc>,
}

impl NormalizedRecord {
    /// Returns `true` if the stock text marks the product as not purchasable.
    #[must_use]
    pub fn is_marked_unavailable(&self) -> bool {
        self.stock_status
            .as_deref()
            .is_some_and(stock_text_unavailable)
    }

    /// Returns `true` when a strikethrough price exists and the current
    /// price undercuts it.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        self.list_price.is_some_and(|list| self.current_price < list)
    }
}

impl From<NormalizedRecord> for RawCapture {
    fn from(record: NormalizedRecord) -> Self {
        Self {
            item_id: record.item_id,
            title: Some(record.title),
            url: Some(record.url),
            current_price: Some(record.current_price),
            list_price: record.list_price,
            discount_percent: record.discount_percent,
            rating: record.rating,
            review_count: record.review_count,
            stock_status: record.stock_status,
            variants: record.variants,
            scraped_at: record.scraped_at,
        }
    }
}

fn stock_text_unavailable(text: &str) -> bool {
    let lower = text.to_lowercase();
    UNAVAILABLE_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(stock: Option<&str>) -> NormalizedRecord {
        NormalizedRecord {
            item_id: Some("B0TESTASIN".to_owned()),
            title: "Acme 14in Laptop".to_owned(),
            url: "https://www.amazon.in/dp/B0TESTASIN".to_owned(),
            current_price: 45999.0,
            list_price: Some(52999.0),
            discount_percent: Some(13.21),
            rating: Some(4.3),
            review_count: Some(4169),
            stock_status: stock.map(str::to_owned),
            variants: BTreeMap::new(),
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn unavailable_marker_is_case_insensitive_substring() {
        let record = make_record(Some("Currently OUT OF STOCK online"));
        assert!(record.is_marked_unavailable());
    }

    #[test]
    fn unavailable_detects_unavailable_text() {
        let record = make_record(Some("This item is unavailable"));
        assert!(record.is_marked_unavailable());
    }

    #[test]
    fn available_text_is_not_unavailable() {
        let record = make_record(Some("In stock, ships tomorrow"));
        assert!(!record.is_marked_unavailable());
    }

    #[test]
    fn absent_stock_text_counts_as_available() {
        let record = make_record(None);
        assert!(!record.is_marked_unavailable());
    }

    #[test]
    fn is_discounted_requires_lower_current_price() {
        let mut record = make_record(None);
        assert!(record.is_discounted());
        record.current_price = 52999.0;
        assert!(!record.is_discounted());
        record.list_price = None;
        assert!(!record.is_discounted());
    }

    #[test]
    fn normalized_round_trips_into_raw_capture() {
        let record = make_record(Some("Available"));
        let raw = RawCapture::from(record.clone());
        assert_eq!(raw.title.as_deref(), Some(record.title.as_str()));
        assert_eq!(raw.url.as_deref(), Some(record.url.as_str()));
        assert_eq!(raw.current_price, Some(record.current_price));
        assert_eq!(raw.scraped_at, record.scraped_at);
    }

    #[test]
    fn serde_round_trip_preserves_fields() {
        let mut record = make_record(Some("Available"));
        record
            .variants
            .insert("ram".to_owned(), "16 GB".to_owned());
        let json = serde_json::to_string(&record).expect("serialization failed");
        let decoded: NormalizedRecord =
            serde_json::from_str(&json).expect("deserialization failed");
        assert_eq!(decoded, record);
    }

    #[test]
    fn empty_variants_are_omitted_from_json() {
        let record = make_record(None);
        let json = serde_json::to_string(&record).expect("serialization failed");
        assert!(!json.contains("variants"));
    }
}
