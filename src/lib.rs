pub mod browser;
pub mod config;
pub mod core;
pub mod extract;
pub mod server;
pub mod stats;

pub use browser::policy::{FilterDecision, ResourceFilterPolicy, ResourceKind};
pub use browser::{BrowserEngine, BrowserSession, ChromiumEngine, MockBrowserEngine, PageHandle};
pub use config::{load_url_list, ScrapeConfig};
pub use core::{
    BoundedScheduler, ScrapeBatchRequest, ScrapeError, ScrapeOrchestrator, ScrapeOutcome,
    ScrapeResult,
};
pub use extract::{PriceExtractor, PriceOutcome};
pub use stats::BatchStats;
