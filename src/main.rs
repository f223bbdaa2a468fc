use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::info;

use stayprice::browser::ChromiumEngine;
use stayprice::config::{load_url_list, ScrapeConfig};
use stayprice::core::ScrapeOrchestrator;
use stayprice::server::{build_router, AppState};
use stayprice::ScrapeResult;

#[tokio::main]
async fn main() -> ScrapeResult<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .filter_module("chromiumoxide", log::LevelFilter::Warn)
        .filter_module("selectors", log::LevelFilter::Warn)
        .filter_module("html5ever", log::LevelFilter::Error)
        .init();

    let mut config = ScrapeConfig::default();
    if let Some(port) = env::var("PORT").ok().and_then(|p| p.parse().ok()) {
        config.port = port;
    }
    if let Ok(path) = env::var("STAYPRICE_URL_LIST") {
        config.url_list_path = path.into();
    }
    if let Ok(bin) = env::var("CHROME_BIN") {
        config.chrome_executable = Some(bin.into());
    }
    if let Ok(origin) = env::var("STAYPRICE_ORIGIN") {
        config.allowed_origin = origin;
    }
    if let Some(secs) = env::var("STAYPRICE_BATCH_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
    {
        config.batch_timeout = Some(Duration::from_secs(secs));
    }

    // The fallback list must be present before we serve anything.
    let default_urls = load_url_list(&config.url_list_path)?;
    info!(
        "Loaded {} default URLs from {}",
        default_urls.len(),
        config.url_list_path.display()
    );

    let engine = Arc::new(ChromiumEngine::new(config.chrome_executable.clone()));
    let orchestrator = ScrapeOrchestrator::new(&config, engine, default_urls)?;
    let router = build_router(Arc::new(AppState { orchestrator }), &config.allowed_origin)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
