mod errors;
pub mod orchestrator;
pub mod scheduler;


pub use errors::{ScrapeError, ScrapeResult};
pub use orchestrator::{ScrapeBatchRequest, ScrapeOrchestrator, ScrapeOutcome, ScrapeTask};
pub use scheduler::BoundedScheduler;
