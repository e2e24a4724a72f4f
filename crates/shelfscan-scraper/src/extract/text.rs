//! Text-level field parsers.
//!
//! Everything here is pure string-in, value-out: the DOM walking lives in
//! the parent module, these functions only interpret what it found.

use std::sync::LazyLock;

use regex::Regex;

use shelfscan_core::Region;

static PRICE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d*)?)").expect("valid price regex"));
static RATING_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("valid rating regex"));
static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d*)?)%").expect("valid percent regex"));
static REVIEW_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*([km])?").expect("valid review regex"));
static PAREN_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d[\d,]*)\)").expect("valid parenthesized count regex"));

/// Listing URLs carry the item id in one of a few path shapes; the bare
/// ten-character segment is tried last because it matches the most.
static ITEM_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)/dp/([A-Z0-9]{10})",
        r"(?i)/gp/product/([A-Z0-9]{10})",
        r"(?i)/product/([A-Z0-9]{10})",
        r"(?i)/([A-Z0-9]{10})(?:[/?]|$)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid item id regex"))
    .collect()
});

static CURRENCY_STRIPPERS: LazyLock<Vec<(Region, Vec<Regex>)>> = LazyLock::new(|| {
    Region::ALL
        .iter()
        .map(|&region| {
            let strippers = region
                .currency_token_patterns()
                .iter()
                .map(|pattern| {
                    Regex::new(&format!("(?i){pattern}")).expect("valid currency regex")
                })
                .collect();
            (region, strippers)
        })
        .collect()
});

fn currency_strippers(region: Region) -> &'static [Regex] {
    CURRENCY_STRIPPERS
        .iter()
        .find(|(r, _)| *r == region)
        .map_or(&[], |(_, strippers)| strippers.as_slice())
}

/// Collapses runs of whitespace to single spaces and trims the ends.
#[must_use]
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a displayed price into its numeric value.
///
/// Currency tokens for the region are stripped first, then any remaining
/// alphabetic characters, whitespace, and thousands separators; the first
/// number left standing wins. `"₹45,999"` in the India region parses to
/// `45999.0`; text with no number parses to `None`.
#[must_use]
pub fn parse_price(text: &str, region: Region) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut stripped = trimmed.to_owned();
    for re in currency_strippers(region) {
        stripped = re.replace_all(&stripped, "").into_owned();
    }
    let stripped: String = stripped
        .chars()
        .filter(|c| !c.is_ascii_alphabetic() && *c != ',' && !c.is_whitespace())
        .collect();

    let caps = PRICE_NUMBER_RE.captures(&stripped)?;
    caps.get(1)?.as_str().parse().ok()
}

/// Percentage saved off the list price, rounded to two decimals.
///
/// A non-positive list price yields `None` (no meaningful baseline); a
/// current price at or above list yields `0.0` rather than a negative
/// discount.
#[must_use]
pub fn calculate_discount(list_price: f64, current_price: f64) -> Option<f64> {
    if list_price <= 0.0 {
        return None;
    }
    if current_price >= list_price {
        return Some(0.0);
    }
    Some(round2((list_price - current_price) / list_price * 100.0))
}

/// Parses an explicit percentage out of discount badge text like
/// `"20% off"` or `"Save 15%"`. The `%` sign is required; a bare number
/// is not a discount.
#[must_use]
pub fn parse_badge_percent(text: &str) -> Option<f64> {
    let caps = PERCENT_RE.captures(text)?;
    caps.get(1)?.as_str().parse().ok()
}

/// Parses a star rating out of text like `"4.3 out of 5 stars"`.
///
/// When `ten_point_correction` is set, values above 5 are assumed to be on
/// a ten-point scale and halved.
#[must_use]
pub fn parse_rating(text: &str, ten_point_correction: bool) -> Option<f64> {
    let caps = RATING_NUMBER_RE.captures(text)?;
    let mut rating: f64 = caps.get(1)?.as_str().parse().ok()?;
    if ten_point_correction && rating > 5.0 {
        rating /= 2.0;
    }
    Some(round2(rating))
}

/// Parses a review count, honoring `k`/`m` shorthand.
///
/// `"5.2K reviews"` parses to `5200` and `"1,234 ratings"` to `1234`. The
/// multiplier suffix is matched before any letters are discarded so that
/// shorthand counts are scaled rather than truncated.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // digits-only capture
pub fn parse_review_count(text: &str) -> Option<u64> {
    let caps = REVIEW_COUNT_RE.captures(text)?;
    let number: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(suffix) if suffix == "k" => 1_000.0,
        Some(suffix) if suffix == "m" => 1_000_000.0,
        _ => 1.0,
    };
    Some((number * multiplier) as u64)
}

/// Finds a parenthesized count like `"(1,234)"` anywhere in `text`.
///
/// Listing cards often render the review count this way next to the stars
/// when no labeled element is present.
#[must_use]
pub fn parenthesized_count(text: &str) -> Option<u64> {
    let caps = PAREN_COUNT_RE.captures(text)?;
    parse_review_count(caps.get(1)?.as_str())
}

/// Extracts the ten-character item id from a listing URL, uppercased.
#[must_use]
pub fn extract_item_id(url: &str) -> Option<String> {
    for re in ITEM_ID_PATTERNS.iter() {
        if let Some(caps) = re.captures(url) {
            if let Some(m) = caps.get(1) {
                return Some(m.as_str().to_ascii_uppercase());
            }
        }
    }
    None
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
