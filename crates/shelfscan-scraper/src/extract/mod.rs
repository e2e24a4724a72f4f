//! Product card extraction.
//!
//! [`Extractor`] walks a captured results document, finds the product
//! cards, and pulls each field out through the ordered strategy tables in
//! [`crate::selectors`]. All DOM work is synchronous over an owned
//! snapshot; nothing here touches the network.

pub mod text;
pub mod variants;

use chrono::Utc;
use scraper::{ElementRef, Html, Selector};

use shelfscan_core::{RawCapture, Region, SearchSession};

use crate::selectors::{
    FieldStrategy, ValueSource, CARD_FALLBACK_SELECTOR, CARD_SELECTORS, DISCOUNT_BADGE_STRATEGIES,
    LIST_PRICE_STRATEGIES, NEXT_PAGE_SELECTORS, PRICE_LABEL_FALLBACK, PRICE_STRATEGIES,
    RATING_STRATEGIES, REVIEW_SELECTORS, STOCK_STRATEGIES, TITLE_STRATEGIES, URL_STRATEGIES,
};
use text::{
    calculate_discount, clean_text, extract_item_id, parenthesized_count, parse_badge_percent,
    parse_price, parse_rating, parse_review_count,
};
use variants::detect_variants;

struct CompiledStrategy {
    selector: Selector,
    source: ValueSource,
}

/// Field extractor for one search session.
///
/// Selectors are compiled once up front; entries that fail to parse are
/// logged and skipped, leaving the rest of their table intact.
pub struct Extractor {
    region: Region,
    origin: String,
    ten_point_rating_correction: bool,
    title: Vec<CompiledStrategy>,
    url: Vec<CompiledStrategy>,
    price: Vec<CompiledStrategy>,
    price_label_fallback: Option<Selector>,
    list_price: Vec<CompiledStrategy>,
    discount_badge: Vec<CompiledStrategy>,
    rating: Vec<CompiledStrategy>,
    review: Vec<Selector>,
    stock: Vec<CompiledStrategy>,
    cards: Vec<Selector>,
    card_fallback: Option<Selector>,
    next_page: Vec<Selector>,
}

impl Extractor {
    #[must_use]
    pub fn for_search(search: &SearchSession) -> Self {
        Self::new(
            search.region,
            search.origin.clone(),
            search.ten_point_rating_correction,
        )
    }

    #[must_use]
    pub fn new(region: Region, origin: String, ten_point_rating_correction: bool) -> Self {
        Self {
            region,
            origin: origin.trim_end_matches('/').to_owned(),
            ten_point_rating_correction,
            title: compile_strategies(TITLE_STRATEGIES),
            url: compile_strategies(URL_STRATEGIES),
            price: compile_strategies(PRICE_STRATEGIES),
            price_label_fallback: compile_selector(PRICE_LABEL_FALLBACK),
            list_price: compile_strategies(LIST_PRICE_STRATEGIES),
            discount_badge: compile_strategies(DISCOUNT_BADGE_STRATEGIES),
            rating: compile_strategies(RATING_STRATEGIES),
            review: compile_selectors(REVIEW_SELECTORS),
            stock: compile_strategies(STOCK_STRATEGIES),
            cards: compile_selectors(CARD_SELECTORS),
            card_fallback: compile_selector(CARD_FALLBACK_SELECTOR),
            next_page: compile_selectors(NEXT_PAGE_SELECTORS),
        }
    }

    /// Extracts every parseable product card from a results document, in
    /// document order.
    #[must_use]
    pub fn extract_listing(&self, html: &str) -> Vec<RawCapture> {
        let document = Html::parse_document(html);
        let cards = self.find_cards(&document);
        let mut captures = Vec::with_capacity(cards.len());
        for card in &cards {
            if let Some(capture) = self.parse_card(*card) {
                captures.push(capture);
            }
        }
        tracing::debug!(
            cards = cards.len(),
            parsed = captures.len(),
            "extracted listing"
        );
        captures
    }

    /// Whether the document advertises an enabled next-page control.
    #[must_use]
    pub fn has_next_page(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        self.next_page
            .iter()
            .any(|selector| document.select(selector).next().is_some())
    }

    /// First card selector yielding at least one element with a non-empty
    /// item-id attribute wins; a bare `data-asin` scan is the last resort.
    fn find_cards<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        for selector in &self.cards {
            let with_id: Vec<ElementRef<'a>> = document
                .select(selector)
                .filter(|card| has_item_id(*card))
                .collect();
            if !with_id.is_empty() {
                return with_id;
            }
        }
        if let Some(fallback) = &self.card_fallback {
            let with_id: Vec<ElementRef<'a>> = document
                .select(fallback)
                .filter(|card| has_item_id(*card))
                .collect();
            if !with_id.is_empty() {
                tracing::debug!(
                    cards = with_id.len(),
                    "card selectors missed, using item-id fallback"
                );
                return with_id;
            }
        }
        Vec::new()
    }

    fn parse_card(&self, card: ElementRef<'_>) -> Option<RawCapture> {
        let mut capture = RawCapture::at(Utc::now());

        let attribute_id = card
            .value()
            .attr("data-asin")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_ascii_uppercase);

        capture.title = self.first_value(card, &self.title);

        let raw_url = self
            .first_value(card, &self.url)
            .or_else(|| attribute_id.as_ref().map(|id| format!("{}/dp/{id}", self.origin)));
        capture.url = raw_url.map(|url| self.absolutize(url));

        let url_id = capture.url.as_deref().and_then(extract_item_id);
        capture.item_id = match (attribute_id, url_id) {
            (Some(attr), Some(from_url)) => {
                if attr != from_url {
                    tracing::warn!(
                        attribute = %attr,
                        from_url = %from_url,
                        "item id mismatch between card attribute and URL"
                    );
                }
                Some(attr)
            }
            (Some(attr), None) => Some(attr),
            (None, from_url) => from_url,
        };

        let price_text = self
            .first_value(card, &self.price)
            .or_else(|| self.price_label(card));
        capture.current_price = price_text
            .as_deref()
            .and_then(|text| parse_price(text, self.region));

        capture.list_price = self
            .first_value(card, &self.list_price)
            .as_deref()
            .and_then(|text| parse_price(text, self.region));

        capture.discount_percent = match (capture.list_price, capture.current_price) {
            (Some(list), Some(current)) if list > 0.0 => calculate_discount(list, current),
            _ => self
                .first_value(card, &self.discount_badge)
                .as_deref()
                .and_then(parse_badge_percent),
        };

        let rating_text = self.first_value(card, &self.rating);
        capture.rating = rating_text
            .as_deref()
            .and_then(|text| parse_rating(text, self.ten_point_rating_correction));

        // Rating labels often carry the count in parentheses; that is the
        // fallback when the dedicated cascade comes up empty.
        capture.review_count = self
            .review_count(card)
            .or_else(|| rating_text.as_deref().and_then(parenthesized_count));

        capture.stock_status = Some(
            self.first_value(card, &self.stock)
                .unwrap_or_else(|| "Available".to_owned()),
        );

        capture.variants = detect_variants(&element_text(card));

        // Cards without a title are promos or placeholders, not products.
        if capture.title.is_none() {
            tracing::debug!("skipping card without a title");
            return None;
        }
        Some(capture)
    }

    fn first_value(&self, card: ElementRef<'_>, strategies: &[CompiledStrategy]) -> Option<String> {
        for strategy in strategies {
            let Some(element) = card.select(&strategy.selector).next() else {
                continue;
            };
            let value = match strategy.source {
                ValueSource::Text => element_text(element),
                ValueSource::Attr(name) => element
                    .value()
                    .attr(name)
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_owned(),
                ValueSource::AriaLabelElseText => element
                    .value()
                    .attr("aria-label")
                    .map(str::trim)
                    .filter(|label| !label.is_empty())
                    .map_or_else(|| element_text(element), str::to_owned),
            };
            if !value.is_empty() {
                return Some(value);
            }
        }
        None
    }

    /// Review counts come from a three-stage cascade: first match per
    /// selector with labeled elements preferred, then a full scan for
    /// anything review-shaped, and finally (in the caller) the count
    /// embedded in the rating label.
    fn review_count(&self, card: ElementRef<'_>) -> Option<u64> {
        for selector in &self.review {
            let Some(element) = card.select(selector).next() else {
                continue;
            };
            if let Some(label) = review_label(element) {
                return parse_review_count(&label);
            }
            let text = element_text(element);
            if text.is_empty() {
                continue;
            }
            if text.contains('(') && text.contains(')') {
                if let Some(count) = parenthesized_count(&text) {
                    return Some(count);
                }
            } else if text.chars().any(|c| c.is_ascii_digit()) {
                return parse_review_count(&text);
            }
        }

        for selector in &self.review {
            for element in card.select(selector) {
                if let Some(label) = review_label(element) {
                    return parse_review_count(&label);
                }
                let text = element_text(element);
                if !text.is_empty() && looks_like_review_text(&text) {
                    return parse_review_count(&text);
                }
            }
        }

        None
    }

    fn price_label(&self, card: ElementRef<'_>) -> Option<String> {
        let selector = self.price_label_fallback.as_ref()?;
        card.select(selector).find_map(|element| {
            element
                .value()
                .attr("aria-label")
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(str::to_owned)
        })
    }

    /// Anchors on result pages come in every flavor: rooted paths,
    /// bare relative paths, and full URLs with tracking queries.
    fn absolutize(&self, url: String) -> String {
        let url = if url.starts_with('/') {
            format!("{}{url}", self.origin)
        } else if !url.starts_with("http") {
            format!("{}/{url}", self.origin)
        } else {
            url
        };
        match url.split_once('?') {
            Some((base, _)) => base.to_owned(),
            None => url,
        }
    }
}

fn has_item_id(card: ElementRef<'_>) -> bool {
    card.value().attr("data-asin").is_some_and(|id| !id.trim().is_empty())
}

fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

fn review_label(element: ElementRef<'_>) -> Option<String> {
    let label = element.value().attr("aria-label")?;
    let lower = label.to_lowercase();
    (lower.contains("review") || lower.contains("rating")).then(|| label.to_owned())
}

fn looks_like_review_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("review") || lower.contains("rating") || text.contains('(')
}

fn compile_strategies(table: &[FieldStrategy]) -> Vec<CompiledStrategy> {
    table
        .iter()
        .filter_map(|strategy| match Selector::parse(strategy.selector) {
            Ok(selector) => Some(CompiledStrategy {
                selector,
                source: strategy.source,
            }),
            Err(err) => {
                tracing::warn!(selector = strategy.selector, error = %err, "skipping unparseable selector");
                None
            }
        })
        .collect()
}

fn compile_selectors(list: &[&str]) -> Vec<Selector> {
    list.iter().filter_map(|raw| compile_selector(raw)).collect()
}

fn compile_selector(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(selector) => Some(selector),
        Err(err) => {
            tracing::warn!(selector = raw, error = %err, "skipping unparseable selector");
            None
        }
    }
}
