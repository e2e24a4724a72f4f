//! Selector strategy tables.
//!
//! Result markup shifts between storefront experiments, so every field is
//! located by an ordered table of strategies tried until one yields a
//! value. The tables are plain data; the walking logic lives in
//! [`crate::extract`].

/// Where a strategy reads its value from once the selector matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// The element's collected text.
    Text,
    /// A named attribute.
    Attr(&'static str),
    /// `aria-label` when present, otherwise the element's text.
    AriaLabelElseText,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldStrategy {
    pub selector: &'static str,
    pub source: ValueSource,
}

impl FieldStrategy {
    const fn text(selector: &'static str) -> Self {
        Self {
            selector,
            source: ValueSource::Text,
        }
    }

    const fn attr(selector: &'static str, name: &'static str) -> Self {
        Self {
            selector,
            source: ValueSource::Attr(name),
        }
    }

    const fn aria_label_else_text(selector: &'static str) -> Self {
        Self {
            selector,
            source: ValueSource::AriaLabelElseText,
        }
    }
}

pub const TITLE_STRATEGIES: &[FieldStrategy] = &[
    FieldStrategy::text("h2 a span"),
    FieldStrategy::text("h2 span"),
    FieldStrategy::text(".s-title-instructions-style h2 a span"),
    FieldStrategy::text("[data-cy='title-recipe'] span"),
    FieldStrategy::text("h2 a"),
    FieldStrategy::text(".a-text-normal span"),
    FieldStrategy::text("span.a-text-normal"),
    FieldStrategy::text("a.a-link-normal span"),
];

pub const URL_STRATEGIES: &[FieldStrategy] = &[
    FieldStrategy::attr("h2 a", "href"),
    FieldStrategy::attr("h2 a.a-link-normal", "href"),
    FieldStrategy::attr("a[href*='/dp/']", "href"),
    FieldStrategy::attr("a[href*='/gp/product/']", "href"),
    FieldStrategy::attr("a.a-link-normal[href*='/dp/']", "href"),
    FieldStrategy::attr("a.a-link-normal[href*='/gp/product/']", "href"),
    FieldStrategy::attr(".s-link-style a", "href"),
    FieldStrategy::attr("a[data-component-type='s-product-image']", "href"),
];

pub const PRICE_STRATEGIES: &[FieldStrategy] = &[
    FieldStrategy::text(".a-price-whole"),
    FieldStrategy::text(".a-price .a-offscreen"),
    FieldStrategy::text("span.a-price"),
    FieldStrategy::text(".a-price-range .a-price-whole"),
    FieldStrategy::text("[data-a-color='price'] span"),
    FieldStrategy::text(".a-price[data-a-color='price']"),
    FieldStrategy::text("span.a-price-whole"),
    FieldStrategy::text(".a-price .a-price-whole"),
];

/// Scanned for an `aria-label` when no [`PRICE_STRATEGIES`] entry yields
/// text; screen-reader labels survive some layouts the visible text does
/// not.
pub const PRICE_LABEL_FALLBACK: &str = ".a-price, [data-a-color='price']";

pub const LIST_PRICE_STRATEGIES: &[FieldStrategy] = &[
    FieldStrategy::text(".a-price.a-text-price .a-offscreen"),
    FieldStrategy::text(".a-price-was .a-offscreen"),
    FieldStrategy::text("span.a-text-price"),
    FieldStrategy::text("[data-a-strike='true']"),
];

/// Only consulted when the discount cannot be computed from the two
/// prices.
pub const DISCOUNT_BADGE_STRATEGIES: &[FieldStrategy] = &[
    FieldStrategy::text(".a-badge-text"),
    FieldStrategy::text(".a-color-price"),
    FieldStrategy::text("[data-a-color='secondary']"),
];

/// The `aria-label` is preferred for ratings; the visible icon text is a
/// truncated duplicate.
pub const RATING_STRATEGIES: &[FieldStrategy] = &[
    FieldStrategy::aria_label_else_text(".a-icon-alt"),
    FieldStrategy::aria_label_else_text("[aria-label*='stars']"),
    FieldStrategy::aria_label_else_text("[aria-label*='star']"),
    FieldStrategy::aria_label_else_text(".a-icon-star-small .a-icon-alt"),
    FieldStrategy::aria_label_else_text(".a-icon-star .a-icon-alt"),
    FieldStrategy::aria_label_else_text("i.a-icon-star span.a-icon-alt"),
];

/// Review counts need a multi-pass cascade (see `crate::extract`), so this
/// is a bare selector list rather than a strategy table.
pub const REVIEW_SELECTORS: &[&str] = &[
    "#acrCustomerReviewText",
    "span#acrCustomerReviewText",
    "span[aria-label*='Reviews']",
    "span[aria-label*='Review']",
    "span[aria-label*='ratings']",
    "span[aria-label*='rating']",
    "a[href*='#customerReviews'] span",
    "a.a-link-normal span",
    ".a-size-base.s-underline-text",
    "span.a-size-base",
    "a span.a-size-base",
];

pub const STOCK_STRATEGIES: &[FieldStrategy] = &[
    FieldStrategy::text(".a-color-state"),
    FieldStrategy::text(".a-color-success"),
    FieldStrategy::text("[aria-label*='stock']"),
];

/// Result card candidates, most specific first. Matches are still required
/// to carry a non-empty `data-asin`.
pub const CARD_SELECTORS: &[&str] = &[
    "[data-component-type='s-search-result']",
    "div[data-asin]:not([data-asin=''])",
    ".s-result-item[data-asin]",
    ".s-result-item",
    "div[data-index]",
    "[data-index]",
];

/// Last resort when no card selector matches anything.
pub const CARD_FALLBACK_SELECTOR: &str = "[data-asin]";

pub const NEXT_PAGE_SELECTORS: &[&str] = &[
    "a.s-pagination-next:not(.s-pagination-disabled)",
    ".a-pagination .a-last:not(.a-disabled)",
    "a[aria-label='Go to next page']",
];

/// Any of these attached means the results pane has rendered.
pub const CONTENT_READY_SELECTORS: &[&str] = &[
    "[data-component-type='s-search-result']",
    "[data-asin]",
    ".s-result-item",
    "#search",
    ".s-main-slot",
];

/// Page titles containing one of these mark an interstitial rather than a
/// results page.
pub const BLOCK_PAGE_TITLE_MARKERS: &[&str] = &["captcha", "robot"];
