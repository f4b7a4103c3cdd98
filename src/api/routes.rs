use axum::{
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::config::CorsConfig;
use crate::dashboard::Dashboard;
use crate::insights::InsightClient;

use super::handlers::{
    generate_insights, get_dashboard, health_check, purge_cache, purge_page_cache, AppState,
};

pub fn create_api_router(
    dashboard: Arc<Dashboard>,
    insights: Option<Arc<InsightClient>>,
    cors: &CorsConfig,
) -> Router {
    let state = Arc::new(AppState {
        dashboard,
        insights,
    });

    let api_routes = Router::new()
        .route("/dashboard/{page}", get(get_dashboard))
        .route("/dashboard/{page}/insights", post(generate_insights))
        .route("/cache", delete(purge_cache))
        .route("/cache/{page}", delete(purge_page_cache))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(cors_layer(cors))
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    match config.allow_origin.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(_)) => {
            warn!("CORS_ALLOW_ORIGIN is not a valid header value, allowing any origin");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}
