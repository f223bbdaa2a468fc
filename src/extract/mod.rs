use log::trace;
use scraper::{Html, Selector};

use crate::core::{ScrapeError, ScrapeResult};

/// Per-task price result. Collapses to the public `"N/A"` sentinel only at
/// the serialization boundary so logs and tests keep the distinction
/// between "page had no price" and "page never loaded".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceOutcome {
    Found(String),
    NotFound,
    Failed(String),
}

pub const PRICE_SENTINEL: &str = "N/A";

impl PriceOutcome {
    pub fn into_price(self) -> String {
        match self {
            PriceOutcome::Found(price) => price,
            _ => PRICE_SENTINEL.to_string(),
        }
    }
}

/// Locates the quoted total on a rendered listing page.
pub struct PriceExtractor {
    selector: Selector,
    currency_prefix: char,
}

impl PriceExtractor {
    pub fn new(selector: &str, currency_prefix: char) -> ScrapeResult<Self> {
        let selector = Selector::parse(selector)
            .map_err(|e| ScrapeError::Selector(format!("{selector:?}: {e}")))?;
        Ok(Self {
            selector,
            currency_prefix,
        })
    }

    /// Scans matches in document order and keeps the last whose trimmed
    /// text starts with the currency prefix. Later matches override
    /// earlier ones; the quote widget repeats the total and the final
    /// occurrence is the one reported.
    pub fn extract(&self, html: &str) -> PriceOutcome {
        let document = Html::parse_document(html);
        let mut best: Option<String> = None;
        for element in document.select(&self.selector) {
            let text: String = element.text().collect();
            let text = text.trim();
            trace!("Price candidate: {:?}", text);
            if text.starts_with(self.currency_prefix) {
                best = Some(text.to_string());
            }
        }
        match best {
            Some(price) => PriceOutcome::Found(price),
            None => PriceOutcome::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> PriceExtractor {
        PriceExtractor::new(".pdp-quote-total span", '$').unwrap()
    }

    fn quote_page(spans: &[&str]) -> String {
        let spans: String = spans
            .iter()
            .map(|s| format!("<span>{s}</span>"))
            .collect();
        format!("<html><body><div class=\"pdp-quote-total\">{spans}</div></body></html>")
    }

    #[test]
    fn returns_not_found_for_zero_matches() {
        let html = "<html><body><p>no quote here</p></body></html>";
        assert_eq!(extractor().extract(html), PriceOutcome::NotFound);
    }

    #[test]
    fn returns_not_found_when_no_match_has_prefix() {
        let html = quote_page(&["Total", "120 USD", ""]);
        assert_eq!(extractor().extract(&html), PriceOutcome::NotFound);
    }

    #[test]
    fn last_prefixed_match_wins() {
        let html = quote_page(&["", "$120", "$150"]);
        assert_eq!(
            extractor().extract(&html),
            PriceOutcome::Found("$150".to_string())
        );
    }

    #[test]
    fn trims_whitespace_around_price() {
        let html = quote_page(&["  $1,299.00  "]);
        assert_eq!(
            extractor().extract(&html),
            PriceOutcome::Found("$1,299.00".to_string())
        );
    }

    #[test]
    fn unprefixed_match_after_price_does_not_override() {
        let html = quote_page(&["$99", "taxes included"]);
        assert_eq!(
            extractor().extract(&html),
            PriceOutcome::Found("$99".to_string())
        );
    }

    #[test]
    fn tolerates_malformed_markup() {
        let html = "<div class=\"pdp-quote-total\"><span>$42</div></span><p>";
        assert_eq!(
            extractor().extract(html),
            PriceOutcome::Found("$42".to_string())
        );
    }

    #[test]
    fn invalid_selector_is_rejected_at_construction() {
        assert!(PriceExtractor::new(":::", '$').is_err());
    }

    #[test]
    fn outcome_collapses_to_sentinel() {
        assert_eq!(PriceOutcome::Found("$9".into()).into_price(), "$9");
        assert_eq!(PriceOutcome::NotFound.into_price(), "N/A");
        assert_eq!(PriceOutcome::Failed("timeout".into()).into_price(), "N/A");
    }
}
