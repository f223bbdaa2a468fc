use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;

use crate::browser::policy::ResourceKind;
use crate::core::ScrapeResult;

pub const DEFAULT_CONCURRENCY: usize = 6;
pub const DEFAULT_PRICE_SELECTOR: &str = ".pdp-quote-total span";
pub const DEFAULT_CURRENCY_PREFIX: char = '$';

/// Process-wide configuration, built once at startup and shared by
/// reference. Nothing here mutates after construction.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Upper bound on concurrently loading pages within one batch.
    pub max_concurrency: usize,
    /// Sub-resource kinds aborted during page loads.
    pub blocked_resources: HashSet<ResourceKind>,
    /// CSS selector scoping the price-total region of a listing page.
    pub price_selector: String,
    /// A match must start with this character to count as a price.
    pub currency_prefix: char,
    /// Overall deadline for one batch; `None` disables the timeout.
    pub batch_timeout: Option<Duration>,
    /// Single origin allowed by the CORS layer.
    pub allowed_origin: String,
    pub port: u16,
    /// Fallback URL list used when a request carries no URLs.
    pub url_list_path: PathBuf,
    /// Explicit Chromium binary; `None` lets the launcher auto-detect.
    pub chrome_executable: Option<PathBuf>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_CONCURRENCY,
            blocked_resources: HashSet::from([
                ResourceKind::Image,
                ResourceKind::Font,
                ResourceKind::Stylesheet,
                ResourceKind::Script,
            ]),
            price_selector: DEFAULT_PRICE_SELECTOR.to_string(),
            currency_prefix: DEFAULT_CURRENCY_PREFIX,
            batch_timeout: Some(Duration::from_secs(120)),
            allowed_origin: "https://realjoy-1.vercel.app".to_string(),
            port: 8080,
            url_list_path: PathBuf::from("list.txt"),
            chrome_executable: None,
        }
    }
}

impl ScrapeConfig {
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }

    pub fn with_price_selector(mut self, selector: impl Into<String>) -> Self {
        self.price_selector = selector.into();
        self
    }

    pub fn with_currency_prefix(mut self, prefix: char) -> Self {
        self.currency_prefix = prefix;
        self
    }

    pub fn with_batch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.batch_timeout = timeout;
        self
    }

    pub fn with_allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origin = origin.into();
        self
    }

    pub fn with_blocked_resources(mut self, blocked: HashSet<ResourceKind>) -> Self {
        self.blocked_resources = blocked;
        self
    }
}

/// Loads the fallback URL list: one URL per line, blank lines skipped.
/// Called once before the server starts serving; an error here is fatal.
pub fn load_url_list(path: &Path) -> ScrapeResult<Vec<String>> {
    let file = File::open(path)?;
    let mut urls = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            urls.push(trimmed.to_string());
        }
    }
    debug!("Loaded {} default URLs from {}", urls.len(), path.display());
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn url_list_skips_blank_lines_and_trims() {
        let mut path = std::env::temp_dir();
        path.push(format!("stayprice-list-{}.txt", std::process::id()));
        let mut file = File::create(&path).unwrap();
        writeln!(file, "https://example.com/a").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  https://example.com/b  ").unwrap();
        writeln!(file, "   ").unwrap();
        drop(file);

        let urls = load_url_list(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(urls, vec!["https://example.com/a", "https://example.com/b"]);
    }

    #[test]
    fn missing_url_list_is_an_error() {
        let result = load_url_list(Path::new("/nonexistent/stayprice-list.txt"));
        assert!(result.is_err());
    }

    #[test]
    fn default_config_matches_expected_limits() {
        let config = ScrapeConfig::default();
        assert_eq!(config.max_concurrency, 6);
        assert_eq!(config.price_selector, ".pdp-quote-total span");
        assert_eq!(config.currency_prefix, '$');
        assert!(config.blocked_resources.contains(&ResourceKind::Image));
        assert!(config.blocked_resources.contains(&ResourceKind::Script));
        assert!(!config.blocked_resources.contains(&ResourceKind::Document));
    }
}
