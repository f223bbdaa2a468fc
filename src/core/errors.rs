use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("no URLs configured: request carried none and no default list is set")]
    NoUrlsConfigured,

    #[error("browser session error: {0}")]
    Session(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("invalid price selector: {0}")]
    Selector(String),

    #[error("invalid CORS origin: {0}")]
    InvalidOrigin(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("batch cancelled")]
    Cancelled,
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
