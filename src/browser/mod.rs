pub mod chromium;
pub mod mock;
pub mod policy;

use async_trait::async_trait;

use crate::core::ScrapeResult;
use policy::ResourceFilterPolicy;

pub use chromium::ChromiumEngine;
pub use mock::MockBrowserEngine;

/// Entry point into the browser collaborator. One session is opened per
/// batch, with the resource filter installed before any page exists.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn open_session(
        &self,
        policy: &ResourceFilterPolicy,
    ) -> ScrapeResult<Box<dyn BrowserSession>>;
}

/// One live browser connection, shared by every task in a batch. Pages are
/// opened per task and never shared; the session must tolerate concurrent
/// `open_page` calls.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigates a fresh page to `url` and waits for the load to settle.
    async fn open_page(&self, url: &str) -> ScrapeResult<Box<dyn PageHandle>>;

    async fn close(&self) -> ScrapeResult<()>;
}

/// A loaded page borrowed from the session. Consumed by `close`.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// The rendered document.
    async fn html(&self) -> ScrapeResult<String>;

    async fn close(self: Box<Self>) -> ScrapeResult<()>;
}
