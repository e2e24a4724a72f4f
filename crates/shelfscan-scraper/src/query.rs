//! Search URL construction.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use shelfscan_core::SearchSession;

/// Everything except unreserved characters is escaped; spaces then become
/// `+`, the form-encoding the search endpoint expects.
const QUOTE_PLUS_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Form-encodes a query value: unreserved characters pass through, spaces
/// become `+`, everything else is percent-escaped.
#[must_use]
pub fn quote_plus(text: &str) -> String {
    utf8_percent_encode(text, QUOTE_PLUS_SET)
        .to_string()
        .replace("%20", "+")
}

/// Builds the search results URL for one page of a session.
///
/// Price bounds ride in the `rh` refinement as `p_36` tokens denominated
/// in minor currency units (value times 100, truncated); either bound may
/// be open. A brand filter becomes a `p_89` token. Tokens are joined with
/// commas, and `page` is only appended from the second page on.
#[must_use]
pub fn build_search_url(search: &SearchSession, page_number: u32) -> String {
    let origin = search.origin.trim_end_matches('/');
    let mut url = format!("{origin}/s?k={}", quote_plus(&search.keyword));

    let mut refinements: Vec<String> = Vec::new();
    if let Some(token) = price_refinement(search.min_price, search.max_price) {
        refinements.push(token);
    }
    if let Some(brand) = &search.filters.brand {
        refinements.push(format!("p_89:{}", quote_plus(brand)));
    }
    if !refinements.is_empty() {
        url.push_str("&rh=");
        url.push_str(&refinements.join(","));
    }

    if page_number > 1 {
        url.push_str(&format!("&page={page_number}"));
    }

    url
}

fn price_refinement(min_price: Option<f64>, max_price: Option<f64>) -> Option<String> {
    match (minor_units(min_price), minor_units(max_price)) {
        (Some(lo), Some(hi)) => Some(format!("p_36:{lo}-{hi}")),
        (Some(lo), None) => Some(format!("p_36:{lo}-")),
        (None, Some(hi)) => Some(format!("p_36:-{hi}")),
        (None, None) => None,
    }
}

/// Converts a price to integral minor units. A bound that truncates to
/// zero is treated as absent; `p_36:0-` would be a no-op refinement.
#[allow(clippy::cast_possible_truncation)] // listing prices fit minor units in i64
fn minor_units(price: Option<f64>) -> Option<i64> {
    let minor = (price? * 100.0) as i64;
    (minor != 0).then_some(minor)
}

#[cfg(test)]
mod tests {
    use shelfscan_core::Region;

    use super::*;

    fn session(keyword: &str, region: Region) -> SearchSession {
        SearchSession::new(keyword, region)
    }

    // ---- quote_plus ----

    #[test]
    fn spaces_become_plus() {
        assert_eq!(quote_plus("gaming laptop"), "gaming+laptop");
    }

    #[test]
    fn reserved_characters_are_escaped() {
        assert_eq!(quote_plus("c++ & rust"), "c%2B%2B+%26+rust");
        assert_eq!(quote_plus("50% off!"), "50%25+off%21");
    }

    #[test]
    fn unreserved_characters_pass_through() {
        assert_eq!(quote_plus("usb-c_hub.v2~x"), "usb-c_hub.v2~x");
    }

    #[test]
    fn non_ascii_is_utf8_escaped() {
        assert_eq!(quote_plus("café"), "caf%C3%A9");
    }

    // ---- build_search_url ----

    #[test]
    fn bare_keyword_on_the_first_page() {
        let search = session("laptop", Region::India);
        assert_eq!(
            build_search_url(&search, 1),
            "https://www.amazon.in/s?k=laptop"
        );
    }

    #[test]
    fn page_parameter_only_appears_after_the_first_page() {
        let search = session("laptop", Region::India);
        assert_eq!(
            build_search_url(&search, 3),
            "https://www.amazon.in/s?k=laptop&page=3"
        );
    }

    #[test]
    fn both_price_bounds_in_minor_units() {
        let mut search = session("laptop", Region::India);
        search.min_price = Some(500.5);
        search.max_price = Some(1000.0);
        assert_eq!(
            build_search_url(&search, 1),
            "https://www.amazon.in/s?k=laptop&rh=p_36:50050-100000"
        );
    }

    #[test]
    fn one_sided_bounds_stay_open() {
        let mut search = session("laptop", Region::Us);
        search.min_price = Some(200.0);
        assert_eq!(
            build_search_url(&search, 1),
            "https://www.amazon.com/s?k=laptop&rh=p_36:20000-"
        );

        let mut search = session("laptop", Region::Us);
        search.max_price = Some(750.0);
        assert_eq!(
            build_search_url(&search, 1),
            "https://www.amazon.com/s?k=laptop&rh=p_36:-75000"
        );
    }

    #[test]
    fn minor_units_truncate_rather_than_round() {
        let mut search = session("laptop", Region::India);
        search.min_price = Some(9.999);
        assert_eq!(
            build_search_url(&search, 1),
            "https://www.amazon.in/s?k=laptop&rh=p_36:999-"
        );
    }

    #[test]
    fn zero_bound_is_treated_as_absent() {
        let mut search = session("laptop", Region::India);
        search.min_price = Some(0.0);
        search.max_price = Some(100.0);
        assert_eq!(
            build_search_url(&search, 1),
            "https://www.amazon.in/s?k=laptop&rh=p_36:-10000"
        );
    }

    #[test]
    fn brand_refinement_is_form_encoded() {
        let mut search = session("running shoes", Region::Uk);
        search.filters.brand = Some("New Balance".into());
        assert_eq!(
            build_search_url(&search, 1),
            "https://www.amazon.co.uk/s?k=running+shoes&rh=p_89:New+Balance"
        );
    }

    #[test]
    fn price_and_brand_tokens_are_comma_joined() {
        let mut search = session("laptop", Region::India);
        search.min_price = Some(30_000.0);
        search.max_price = Some(60_000.0);
        search.filters.brand = Some("lenovo".into());
        assert_eq!(
            build_search_url(&search, 2),
            "https://www.amazon.in/s?k=laptop&rh=p_36:3000000-6000000,p_89:lenovo&page=2"
        );
    }

    #[test]
    fn origin_override_replaces_the_storefront() {
        let mut search = session("laptop", Region::India);
        search.origin = "http://127.0.0.1:9090/".into();
        assert_eq!(
            build_search_url(&search, 1),
            "http://127.0.0.1:9090/s?k=laptop"
        );
    }
}
