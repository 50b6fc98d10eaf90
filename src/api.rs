// src/api.rs
//! On-demand entry point. Every method and path gets the feed.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::cache::{CacheGateway, Fetched};

/// Diagnostic header: `HIT`, `MISS` or `BYPASS`.
pub const CACHE_HEADER: &str = "x-feed-cache";

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<CacheGateway>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .fallback(serve_feed)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn serve_feed(State(state): State<AppState>) -> Response {
    match state.gateway.get_or_refresh().await {
        Ok(fetched) => feed_response(fetched),
        Err(e) => error_response(&e),
    }
}

fn feed_response(fetched: Fetched) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (HeaderName::from_static(CACHE_HEADER), fetched.status.as_str()),
        ],
        fetched.payload,
    )
        .into_response()
}

/// Only internal faults land here; upstream source trouble never does.
fn error_response(e: &anyhow::Error) -> Response {
    tracing::error!(target: "feed", error = ?e, "feed request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
        .into_response()
}
