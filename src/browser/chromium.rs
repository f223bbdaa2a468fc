use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::Page;
use futures::StreamExt;
use log::{debug, warn};
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};

use crate::core::{ScrapeError, ScrapeResult};

use super::policy::{FilterDecision, ResourceFilterPolicy, ResourceKind};
use super::{BrowserEngine, BrowserSession, PageHandle};

/// Headless-Chromium implementation of the browser collaborator. Each
/// session launches its own browser process and tears it down on close.
pub struct ChromiumEngine {
    executable: Option<PathBuf>,
}

impl ChromiumEngine {
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self { executable }
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn open_session(
        &self,
        policy: &ResourceFilterPolicy,
    ) -> ScrapeResult<Box<dyn BrowserSession>> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .args(vec![
                "--disable-gpu",
                "--disable-dev-shm-usage",
                "--no-first-run",
                "--no-default-browser-check",
            ]);
        if let Some(bin) = &self.executable {
            builder = builder.chrome_executable(bin);
        }
        let config = builder.build().map_err(ScrapeError::Session)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Session(e.to_string()))?;

        // The handler stream must be polled for the connection to make
        // progress; it ends when the browser goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser event error: {}", e);
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser: Mutex::new(browser),
            handler_task,
            policy: policy.clone(),
        }))
    }
}

struct ChromiumSession {
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
    policy: ResourceFilterPolicy,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn open_page(&self, url: &str) -> ScrapeResult<Box<dyn PageHandle>> {
        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| ScrapeError::Browser(e.to_string()))?
        };

        // Interception has to be live before navigation starts or early
        // sub-resource requests slip through.
        let filter_task = install_filter(&page, &self.policy).await?;

        let result = async {
            page.goto(url)
                .await
                .map_err(|e| ScrapeError::Browser(e.to_string()))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| ScrapeError::Browser(e.to_string()))?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            filter_task.abort();
            if let Err(close_err) = page.close().await {
                debug!("Failed to close page after navigation error: {}", close_err);
            }
            return Err(e);
        }

        Ok(Box::new(ChromiumPage { page, filter_task }))
    }

    async fn close(&self) -> ScrapeResult<()> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|e| ScrapeError::Session(e.to_string()))?;
        if let Err(e) = browser.wait().await {
            warn!("Browser did not exit cleanly: {}", e);
        }
        self.handler_task.abort();
        Ok(())
    }
}

struct ChromiumPage {
    page: Page,
    filter_task: AbortHandle,
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn html(&self) -> ScrapeResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))
    }

    async fn close(self: Box<Self>) -> ScrapeResult<()> {
        self.filter_task.abort();
        self.page
            .close()
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))
    }
}

/// Enables the CDP fetch domain with one pattern per blocked kind and
/// fails every paused request the policy rejects. Runs until aborted or
/// the page's event stream ends.
async fn install_filter(
    page: &Page,
    policy: &ResourceFilterPolicy,
) -> ScrapeResult<AbortHandle> {
    let patterns: Vec<RequestPattern> = policy
        .blocked_kinds()
        .filter_map(cdp_resource_type)
        .map(|rt| RequestPattern::builder().resource_type(rt).build())
        .collect();

    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(|e| ScrapeError::Browser(e.to_string()))?;

    let enable = EnableParams::builder().patterns(patterns).build();
    page.execute(enable)
        .await
        .map_err(|e| ScrapeError::Browser(e.to_string()))?;

    let page = page.clone();
    let policy = policy.clone();
    let task = tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let kind = resource_kind(&event.resource_type);
            let outcome = match policy.decide(kind) {
                FilterDecision::Abort => page
                    .execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ()),
                FilterDecision::Allow => page
                    .execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(|_| ()),
            };
            if let Err(e) = outcome {
                debug!("Request interception resolve failed: {}", e);
            }
        }
    });
    Ok(task.abort_handle())
}

fn cdp_resource_type(kind: ResourceKind) -> Option<ResourceType> {
    match kind {
        ResourceKind::Image => Some(ResourceType::Image),
        ResourceKind::Font => Some(ResourceType::Font),
        ResourceKind::Stylesheet => Some(ResourceType::Stylesheet),
        ResourceKind::Script => Some(ResourceType::Script),
        ResourceKind::Document => Some(ResourceType::Document),
        ResourceKind::Xhr => Some(ResourceType::Xhr),
        ResourceKind::Other => None,
    }
}

fn resource_kind(rt: &ResourceType) -> ResourceKind {
    match rt {
        ResourceType::Image => ResourceKind::Image,
        ResourceType::Font => ResourceKind::Font,
        ResourceType::Stylesheet => ResourceKind::Stylesheet,
        ResourceType::Script => ResourceKind::Script,
        ResourceType::Document => ResourceKind::Document,
        ResourceType::Xhr | ResourceType::Fetch => ResourceKind::Xhr,
        _ => ResourceKind::Other,
    }
}
