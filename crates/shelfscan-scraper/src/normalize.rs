//! Normalization and deduplication of raw captures.
//!
//! Captures come off the page noisy: stray whitespace, missing ids,
//! half-filled cards. This stage trims text, backfills identifiers from
//! URLs, drops records without the required trio (title, price, URL),
//! removes duplicates through a cascade of keys, and sorts the survivors
//! by price.

use std::collections::HashSet;
use std::hash::Hash;

use shelfscan_core::{NormalizedRecord, RawCapture};

use crate::extract::text::{clean_text, extract_item_id};

/// Outcome of one pipeline pass.
#[derive(Debug)]
pub struct ProcessReport {
    /// Validated, deduplicated records sorted ascending by current price.
    pub records: Vec<NormalizedRecord>,
    /// Captures dropped for failing validation.
    pub invalid_dropped: usize,
    /// Records removed by the dedup cascade.
    pub duplicates_dropped: usize,
}

/// Runs the full pipeline over a batch of captures.
#[must_use]
pub fn process(captures: Vec<RawCapture>, deduplicate: bool) -> ProcessReport {
    let total = captures.len();
    tracing::info!(captures = total, "processing scraped captures");

    let mut records: Vec<NormalizedRecord> = captures
        .into_iter()
        .filter_map(|capture| validate(normalize(capture)))
        .collect();
    let invalid_dropped = total - records.len();
    if invalid_dropped > 0 {
        tracing::info!(dropped = invalid_dropped, "dropped captures failing validation");
    }

    let mut duplicates_dropped = 0;
    if deduplicate {
        let before = records.len();
        records = dedup(records);
        duplicates_dropped = before - records.len();
        if duplicates_dropped > 0 {
            tracing::info!(removed = duplicates_dropped, "removed duplicate records");
        }
    }

    for record in &mut records {
        coerce(record);
    }

    // Stable sort keeps discovery order for equal prices.
    records.sort_by(|a, b| a.current_price.total_cmp(&b.current_price));

    tracing::info!(records = records.len(), "pipeline complete");
    ProcessReport {
        records,
        invalid_dropped,
        duplicates_dropped,
    }
}

fn normalize(mut capture: RawCapture) -> RawCapture {
    capture.title = capture
        .title
        .as_deref()
        .map(clean_text)
        .filter(|title| !title.is_empty());
    capture.stock_status = capture
        .stock_status
        .as_deref()
        .map(clean_text)
        .filter(|status| !status.is_empty());
    capture.url = capture
        .url
        .map(|url| url.trim().to_owned())
        .filter(|url| !url.is_empty());
    if capture.item_id.is_none() {
        capture.item_id = capture.url.as_deref().and_then(extract_item_id);
    }
    capture
}

fn validate(capture: RawCapture) -> Option<NormalizedRecord> {
    let title = capture.title?;
    let url = capture.url?;
    let current_price = capture.current_price.filter(|price| price.is_finite())?;
    Some(NormalizedRecord {
        item_id: capture.item_id,
        title,
        url,
        current_price,
        list_price: capture.list_price,
        discount_percent: capture.discount_percent,
        rating: capture.rating,
        review_count: capture.review_count,
        stock_status: capture.stock_status,
        variants: capture.variants,
        scraped_at: capture.scraped_at,
    })
}

/// Cascading dedup: by identifier, then URL, then title, each pass keeping
/// the first occurrence and feeding the next pass. Records without an
/// identifier pass the first stage untouched.
fn dedup(records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
    let by_id = dedup_pass(records, |record| record.item_id.clone());
    let by_url = dedup_pass(by_id, |record| Some(record.url.clone()));
    dedup_pass(by_url, |record| Some(record.title.clone()))
}

fn dedup_pass<K, F>(records: Vec<NormalizedRecord>, mut key: F) -> Vec<NormalizedRecord>
where
    K: Eq + Hash,
    F: FnMut(&NormalizedRecord) -> Option<K>,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| match key(record) {
            Some(value) => seen.insert(value),
            None => true,
        })
        .collect()
}

fn coerce(record: &mut NormalizedRecord) {
    record.list_price = record.list_price.filter(|value| value.is_finite());
    record.discount_percent = record.discount_percent.filter(|value| value.is_finite());
    record.rating = record.rating.filter(|value| value.is_finite());
}
