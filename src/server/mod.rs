use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::error;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::core::{ScrapeBatchRequest, ScrapeError, ScrapeOrchestrator, ScrapeResult};

pub struct AppState {
    pub orchestrator: ScrapeOrchestrator,
}

/// Routes plus the CORS layer. Method-not-allowed and JSON rejections are
/// owned by axum's routing and extractors; the batch never starts for
/// either. A malformed origin is a configuration error, not a cue to
/// widen the single-origin policy.
pub fn build_router(state: Arc<AppState>, allowed_origin: &str) -> ScrapeResult<Router> {
    let origin = allowed_origin
        .parse::<HeaderValue>()
        .map_err(|_| ScrapeError::InvalidOrigin(allowed_origin.to_string()))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .route("/scrape", post(scrape))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state))
}

async fn scrape(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScrapeBatchRequest>,
) -> Result<Response, ApiError> {
    let outcomes = state
        .orchestrator
        .handle_batch(req, CancellationToken::new())
        .await?;
    Ok(Json(outcomes).into_response())
}

async fn health() -> &'static str {
    "ok"
}

struct ApiError(ScrapeError);

impl From<ScrapeError> for ApiError {
    fn from(e: ScrapeError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ScrapeError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!("Batch failed: {}", self.0);
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::MockBrowserEngine;
    use crate::config::ScrapeConfig;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_router(engine: MockBrowserEngine) -> Router {
        let config = ScrapeConfig::default();
        let orchestrator =
            ScrapeOrchestrator::new(&config, Arc::new(engine), Vec::new()).unwrap();
        build_router(Arc::new(AppState { orchestrator }), "https://example.org").unwrap()
    }

    fn quote_page(price: &str) -> String {
        format!("<div class=\"pdp-quote-total\"><span>{price}</span></div>")
    }

    #[tokio::test]
    async fn post_scrape_returns_outcome_array() {
        let full_url = "https://example.com/a?checkin=2024-06-01&checkout=2024-06-05";
        let engine = MockBrowserEngine::new().with_page(full_url, quote_page("$99"));
        let router = test_router(engine);

        let body = json!({
            "arrivalDate": "2024-06-01",
            "departureDate": "2024-06-05",
            "urls": ["https://example.com/a"],
        });
        let request = Request::post("/scrape")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let outcomes: Vec<serde_json::Value> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0]["url"], full_url);
        assert_eq!(outcomes[0]["price"], "$99");
    }

    #[tokio::test]
    async fn non_post_method_is_rejected() {
        let router = test_router(MockBrowserEngine::new());
        let request = Request::get("/scrape").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn malformed_json_is_rejected_before_any_task_starts() {
        let engine = MockBrowserEngine::new();
        let router = test_router(engine.clone());

        let request = Request::post("/scrape")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert!(response.status().is_client_error());
        assert_eq!(engine.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn empty_request_and_empty_default_list_is_a_server_error() {
        let router = test_router(MockBrowserEngine::new());
        let body = json!({
            "arrivalDate": "2024-06-01",
            "departureDate": "2024-06-05",
            "urls": [],
        });
        let request = Request::post("/scrape")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_cors_origin_fails_router_construction() {
        let config = ScrapeConfig::default();
        let orchestrator =
            ScrapeOrchestrator::new(&config, Arc::new(MockBrowserEngine::new()), Vec::new())
                .unwrap();
        let result = build_router(Arc::new(AppState { orchestrator }), "bad\norigin");
        assert!(matches!(result, Err(ScrapeError::InvalidOrigin(_))));
    }

    #[tokio::test]
    async fn health_endpoint_answers() {
        let router = test_router(MockBrowserEngine::new());
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
