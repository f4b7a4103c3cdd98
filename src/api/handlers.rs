use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::dashboard::{Dashboard, Page, PageOrchestrator, PageView};
use crate::insights::{Insight, InsightClient};
use crate::metrics::MarketFilter;
use crate::range::{DateRange, Preset};

pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    pub insights: Option<Arc<InsightClient>>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub preset: Option<Preset>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub market: Option<String>,
    #[serde(default)]
    pub force: bool,
}

impl DashboardQuery {
    /// Explicit dates win over a preset; with neither, the last 30 days
    fn range(&self) -> Result<DateRange, ApiError> {
        match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => DateRange::parse(start, end)
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string())),
            (None, None) => Ok(self
                .preset
                .unwrap_or_default()
                .resolve(Utc::now().date_naive())),
            _ => Err(api_error(
                StatusCode::BAD_REQUEST,
                "start_date and end_date must be given together",
            )),
        }
    }

    fn market(&self) -> Result<MarketFilter, ApiError> {
        match &self.market {
            Some(raw) => raw
                .parse::<MarketFilter>()
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, e)),
            None => Ok(MarketFilter::All),
        }
    }
}

fn orchestrator(dashboard: &Dashboard, raw: &str) -> Result<Arc<PageOrchestrator>, ApiError> {
    let page = raw
        .parse::<Page>()
        .map_err(|e| api_error(StatusCode::NOT_FOUND, e))?;
    dashboard
        .page(page)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("page '{page}' is not served")))
}

async fn load_view(state: &AppState, page: &str, query: &DashboardQuery) -> Result<PageView, ApiError> {
    let orchestrator = orchestrator(&state.dashboard, page)?;
    let range = query.range()?;
    let market = query.market()?;

    let snapshot = orchestrator.load(range, query.force).await;
    Ok(PageView::build(&snapshot, market, Utc::now()))
}

/// Load a dashboard page and return its market-filtered view
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Path(page): Path<String>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<PageView>, ApiError> {
    load_view(&state, &page, &query).await.map(Json)
}

/// Generate narrative insights for a dashboard page
pub async fn generate_insights(
    State(state): State<Arc<AppState>>,
    Path(page): Path<String>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Insight>, ApiError> {
    let Some(client) = state.insights.clone() else {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Insights are not configured",
        ));
    };

    let view = load_view(&state, &page, &query).await?;

    match client.generate(&view).await {
        Ok(insight) => Ok(Json(insight)),
        Err(e) => {
            error!("Insight generation for {} failed: {}", view.page, e);
            Err(api_error(
                StatusCode::BAD_GATEWAY,
                format!("Failed to generate insights: {}", e),
            ))
        }
    }
}

/// Drop every page's cached payload
pub async fn purge_cache(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    purge(&state.dashboard, &Page::ALL).await
}

/// Drop one page's cached payload
pub async fn purge_page_cache(
    State(state): State<Arc<AppState>>,
    Path(page): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let page = orchestrator(&state.dashboard, &page)?.page();
    purge(&state.dashboard, &[page]).await
}

async fn purge(dashboard: &Dashboard, pages: &[Page]) -> Result<Json<SuccessResponse>, ApiError> {
    match dashboard.purge(pages).await {
        Ok(removed) => {
            info!("Cache purge via API removed {} entries", removed);
            Ok(Json(SuccessResponse {
                message: format!("Purged {} cached page(s)", removed),
            }))
        }
        Err(e) => Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to purge cache: {}", e),
        )),
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
