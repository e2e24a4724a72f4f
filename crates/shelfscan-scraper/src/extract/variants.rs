//! Variant detection over the full card text.
//!
//! Listing cards rarely expose RAM, storage, or color as structured
//! attributes, so these are sniffed from the lowercased card text. Pattern
//! order is fixed: the first matching pattern (or keyword) wins, regardless
//! of where in the text it appears.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static RAM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"(\d+)\s*gb\s*ram", r"(\d+)\s*gb\s*ddr"]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("valid ram regex"))
        .collect()
});

static STORAGE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(\d+)\s*gb\s*(?:ssd|hdd|storage)").expect("valid storage regex"),
            "GB",
        ),
        (
            Regex::new(r"(\d+)\s*tb\s*(?:ssd|hdd|storage)").expect("valid storage regex"),
            "TB",
        ),
    ]
});

const COLOR_KEYWORDS: [&str; 7] = ["black", "white", "silver", "gray", "blue", "red", "gold"];

/// Sniffs RAM, storage, and color variants out of a card's visible text.
///
/// Returns an empty map when nothing matches.
#[must_use]
pub fn detect_variants(card_text: &str) -> BTreeMap<String, String> {
    let lower = card_text.to_lowercase();
    let mut variants = BTreeMap::new();

    if let Some(ram) = detect_ram(&lower) {
        variants.insert("ram".to_owned(), ram);
    }
    if let Some(storage) = detect_storage(&lower) {
        variants.insert("storage".to_owned(), storage);
    }
    if let Some(color) = detect_color(&lower) {
        variants.insert("color".to_owned(), color);
    }

    variants
}

fn detect_ram(lower: &str) -> Option<String> {
    for re in RAM_PATTERNS.iter() {
        if let Some(caps) = re.captures(lower) {
            if let Some(size) = caps.get(1) {
                return Some(format!("{} GB", size.as_str()));
            }
        }
    }
    None
}

fn detect_storage(lower: &str) -> Option<String> {
    for (re, unit) in STORAGE_PATTERNS.iter() {
        if let Some(caps) = re.captures(lower) {
            if let Some(size) = caps.get(1) {
                return Some(format!("{} {unit}", size.as_str()));
            }
        }
    }
    None
}

fn detect_color(lower: &str) -> Option<String> {
    for color in COLOR_KEYWORDS {
        if lower.contains(color) {
            let mut capitalized = color.to_owned();
            capitalized[..1].make_ascii_uppercase();
            return Some(capitalized);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_all_three_from_a_laptop_card() {
        let text = "Dell Inspiron 15, 16GB RAM, 512 GB SSD, Silver, Windows 11";
        let got = detect_variants(text);
        assert_eq!(got.get("ram").map(String::as_str), Some("16 GB"));
        assert_eq!(got.get("storage").map(String::as_str), Some("512 GB"));
        assert_eq!(got.get("color").map(String::as_str), Some("Silver"));
    }

    #[test]
    fn ddr_marking_counts_as_ram() {
        let got = detect_variants("Gaming PC 32 GB DDR5 memory");
        assert_eq!(got.get("ram").map(String::as_str), Some("32 GB"));
    }

    #[test]
    fn terabyte_storage_keeps_its_unit() {
        let got = detect_variants("External drive 2TB HDD black");
        assert_eq!(got.get("storage").map(String::as_str), Some("2 TB"));
        assert_eq!(got.get("color").map(String::as_str), Some("Black"));
    }

    #[test]
    fn gigabyte_pattern_wins_over_terabyte_regardless_of_position() {
        // Pattern order decides, not text order.
        let got = detect_variants("1 TB HDD plus 256 GB SSD boot drive");
        assert_eq!(got.get("storage").map(String::as_str), Some("256 GB"));
    }

    #[test]
    fn color_follows_keyword_order_not_text_order() {
        let got = detect_variants("red and black edition");
        assert_eq!(got.get("color").map(String::as_str), Some("Black"));
    }

    #[test]
    fn plain_text_yields_no_variants() {
        assert!(detect_variants("USB-C charging cable, 1 meter").is_empty());
    }
}
