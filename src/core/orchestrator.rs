use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::browser::policy::ResourceFilterPolicy;
use crate::browser::{BrowserEngine, BrowserSession};
use crate::config::ScrapeConfig;
use crate::extract::{PriceExtractor, PriceOutcome};
use crate::stats::BatchStats;

use super::scheduler::BoundedScheduler;
use super::{ScrapeError, ScrapeResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeBatchRequest {
    pub arrival_date: String,
    pub departure_date: String,
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeOutcome {
    pub url: String,
    pub price: String,
}

/// One unit of work: the listing URL plus the stay window baked into its
/// query string. Built once per batch, consumed once by the scheduler.
#[derive(Debug, Clone)]
pub struct ScrapeTask {
    pub base_url: String,
    pub full_url: String,
}

impl ScrapeTask {
    pub fn new(base_url: &str, arrival: &str, departure: &str) -> Self {
        let full_url = match Url::parse(base_url) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("checkin", arrival)
                    .append_pair("checkout", departure);
                url.to_string()
            }
            // An unparseable URL still gets a task; navigation will fail
            // and fold into an N/A outcome like any other bad page.
            Err(_) => format!("{base_url}?checkin={arrival}&checkout={departure}"),
        };
        Self {
            base_url: base_url.to_string(),
            full_url,
        }
    }
}

/// Drives one batch end to end: resolves the URL list, opens a single
/// browser session with the resource filter installed, fans the tasks out
/// through the scheduler, and shapes the aggregated response.
pub struct ScrapeOrchestrator {
    engine: Arc<dyn BrowserEngine>,
    extractor: Arc<PriceExtractor>,
    policy: ResourceFilterPolicy,
    scheduler: BoundedScheduler,
    default_urls: Vec<String>,
    batch_timeout: Option<Duration>,
}

impl ScrapeOrchestrator {
    pub fn new(
        config: &ScrapeConfig,
        engine: Arc<dyn BrowserEngine>,
        default_urls: Vec<String>,
    ) -> ScrapeResult<Self> {
        Ok(Self {
            engine,
            extractor: Arc::new(PriceExtractor::new(
                &config.price_selector,
                config.currency_prefix,
            )?),
            policy: ResourceFilterPolicy::new(config.blocked_resources.clone()),
            scheduler: BoundedScheduler::new(config.max_concurrency),
            default_urls,
            batch_timeout: config.batch_timeout,
        })
    }

    /// Fails only when the batch cannot run at all: no URLs anywhere, the
    /// session cannot be established, or the batch is cancelled. Per-task
    /// failures never surface here; they become `"N/A"` outcomes. Every
    /// completed batch returns exactly one outcome per task.
    pub async fn handle_batch(
        &self,
        req: ScrapeBatchRequest,
        cancel: CancellationToken,
    ) -> ScrapeResult<Vec<ScrapeOutcome>> {
        let urls: &[String] = if req.urls.is_empty() {
            debug!("Request carried no URLs, falling back to default list");
            &self.default_urls
        } else {
            &req.urls
        };
        if urls.is_empty() {
            return Err(ScrapeError::NoUrlsConfigured);
        }

        let tasks: Vec<ScrapeTask> = urls
            .iter()
            .map(|u| ScrapeTask::new(u, &req.arrival_date, &req.departure_date))
            .collect();
        info!(
            "Starting batch: {} tasks, stay {} to {}",
            tasks.len(),
            req.arrival_date,
            req.departure_date
        );

        let cancel = cancel.child_token();
        let watchdog = self.batch_timeout.map(|timeout| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                warn!("Batch timeout after {:?}, cancelling", timeout);
                cancel.cancel();
            })
        });

        // Session establishment is a blocking collaborator call like any
        // other; the batch deadline and the caller's token bound it too.
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScrapeError::Cancelled),
            opened = self.engine.open_session(&self.policy) => opened,
        };
        let session: Arc<dyn BrowserSession> = match opened {
            Ok(session) => Arc::from(session),
            Err(e) => {
                if let Some(watchdog) = watchdog {
                    watchdog.abort();
                }
                return Err(e);
            }
        };
        let stats = Arc::new(BatchStats::new(tasks.len()));

        let outcomes = {
            let session = Arc::clone(&session);
            let extractor = Arc::clone(&self.extractor);
            let stats = Arc::clone(&stats);
            self.scheduler
                .run(tasks, cancel.clone(), move |task: ScrapeTask| {
                    let session = Arc::clone(&session);
                    let extractor = Arc::clone(&extractor);
                    let stats = Arc::clone(&stats);
                    async move {
                        let outcome = scrape_one(&*session, &extractor, &task).await;
                        stats.record(&outcome);
                        ScrapeOutcome {
                            url: task.full_url,
                            price: outcome.into_price(),
                        }
                    }
                })
                .await
        };

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }
        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }
        if cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }

        stats.finish();
        stats.log_summary();
        Ok(outcomes)
    }
}

/// One task, strictly sequential: open, load, extract, close. Any failure
/// along the way folds into the outcome instead of propagating.
async fn scrape_one(
    session: &dyn BrowserSession,
    extractor: &PriceExtractor,
    task: &ScrapeTask,
) -> PriceOutcome {
    let page = match session.open_page(&task.full_url).await {
        Ok(page) => page,
        Err(e) => {
            warn!("Failed to load {}: {}", task.full_url, e);
            return PriceOutcome::Failed(e.to_string());
        }
    };

    let outcome = match page.html().await {
        Ok(html) => extractor.extract(&html),
        Err(e) => {
            warn!("Failed to read page content for {}: {}", task.full_url, e);
            PriceOutcome::Failed(e.to_string())
        }
    };

    if let Err(e) = page.close().await {
        debug!("Failed to close page for {}: {}", task.full_url, e);
    }
    outcome
}
