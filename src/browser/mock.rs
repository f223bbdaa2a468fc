use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::core::{ScrapeError, ScrapeResult};

use super::policy::ResourceFilterPolicy;
use super::{BrowserEngine, BrowserSession, PageHandle};

/// Canned behavior for one URL.
#[derive(Clone)]
pub enum MockPage {
    Html(String),
    NavigationFailure(String),
}

/// In-memory browser for tests, keyed by full URL. Instrumented with a
/// gauge of concurrently open pages (plus its high-water mark) so tests
/// can assert the scheduler's concurrency bound from the outside.
#[derive(Clone, Default)]
pub struct MockBrowserEngine {
    pages: HashMap<String, MockPage>,
    load_delay: Option<Duration>,
    fail_session: bool,
    hang_session: bool,
    counters: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    open_pages: AtomicUsize,
    peak_open_pages: AtomicUsize,
    pages_opened: AtomicUsize,
    pages_closed: AtomicUsize,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
}

impl MockBrowserEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), MockPage::Html(html.into()));
        self
    }

    pub fn with_failure(mut self, url: impl Into<String>, reason: impl Into<String>) -> Self {
        self.pages
            .insert(url.into(), MockPage::NavigationFailure(reason.into()));
        self
    }

    /// Every page load sleeps this long, widening the window in which
    /// concurrent loads overlap.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    pub fn with_session_failure(mut self) -> Self {
        self.fail_session = true;
        self
    }

    /// `open_session` never resolves, standing in for a browser launch
    /// that wedges.
    pub fn with_session_hang(mut self) -> Self {
        self.hang_session = true;
        self
    }

    pub fn peak_open_pages(&self) -> usize {
        self.counters.peak_open_pages.load(Ordering::SeqCst)
    }

    pub fn open_pages(&self) -> usize {
        self.counters.open_pages.load(Ordering::SeqCst)
    }

    pub fn pages_opened(&self) -> usize {
        self.counters.pages_opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.counters.pages_closed.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.counters.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.counters.sessions_closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserEngine for MockBrowserEngine {
    async fn open_session(
        &self,
        _policy: &ResourceFilterPolicy,
    ) -> ScrapeResult<Box<dyn BrowserSession>> {
        if self.hang_session {
            futures::future::pending::<()>().await;
        }
        if self.fail_session {
            return Err(ScrapeError::Session("mock session refused".to_string()));
        }
        self.counters.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            pages: self.pages.clone(),
            load_delay: self.load_delay,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct MockSession {
    pages: HashMap<String, MockPage>,
    load_delay: Option<Duration>,
    counters: Arc<Counters>,
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn open_page(&self, url: &str) -> ScrapeResult<Box<dyn PageHandle>> {
        let current = self.counters.open_pages.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters
            .peak_open_pages
            .fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.load_delay {
            sleep(delay).await;
        }

        let canned = self.pages.get(url).cloned();
        match canned {
            Some(MockPage::Html(html)) => {
                self.counters.pages_opened.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(MockPageHandle {
                    html,
                    counters: Arc::clone(&self.counters),
                }))
            }
            Some(MockPage::NavigationFailure(reason)) => {
                self.counters.open_pages.fetch_sub(1, Ordering::SeqCst);
                Err(ScrapeError::Browser(reason))
            }
            None => {
                self.counters.open_pages.fetch_sub(1, Ordering::SeqCst);
                Err(ScrapeError::Browser(format!("no canned page for {url}")))
            }
        }
    }

    async fn close(&self) -> ScrapeResult<()> {
        self.counters.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockPageHandle {
    html: String,
    counters: Arc<Counters>,
}

#[async_trait]
impl PageHandle for MockPageHandle {
    async fn html(&self) -> ScrapeResult<String> {
        Ok(self.html.clone())
    }

    async fn close(self: Box<Self>) -> ScrapeResult<()> {
        self.counters.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// The open-page gauge tracks handle lifetime, not explicit closes, so a
// handle dropped mid-batch (cancellation) still releases its slot.
impl Drop for MockPageHandle {
    fn drop(&mut self) {
        self.counters.open_pages.fetch_sub(1, Ordering::SeqCst);
    }
}
