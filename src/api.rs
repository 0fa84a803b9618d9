use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use chrono_tz::Tz;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use utoipa::{OpenApi, ToSchema};

use crate::chart::{ChartView, NoDataReason};
use crate::dashboard;
use crate::pipeline::DashboardSnapshot;
use crate::series::{Measurement, SeriesTable};

#[derive(Clone)]
pub struct AppState {
    pub snapshots: watch::Receiver<DashboardSnapshot>,
    pub refresh_interval_seconds: u64,
    pub timezone: Tz,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, get_chart, get_series),
    components(schemas(
        HealthResponse,
        DashboardSnapshot,
        ChartView,
        NoDataReason,
        SeriesTable,
        Measurement
    )),
    tags((name = "dashboard", description = "Reservoir upstream level dashboard"))
)]
pub struct ApiDoc;

pub fn generate_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/chart", get(get_chart))
        .route("/series", get(get_series))
        .route("/openapi.json", get(openapi_document));

    Router::new()
        .route("/", get(dashboard_page))
        .nest("/api/v1", api_routes)
        .with_state(state)
}

#[instrument(skip(state))]
async fn dashboard_page(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let snapshot = state.snapshots.borrow().clone();
    debug!("Rendering dashboard page (has_data={})", snapshot.has_data());

    let page = dashboard::render_page(&snapshot, state.refresh_interval_seconds, state.timezone)
        .map_err(|e| {
            error!("Failed to render dashboard page: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(([(header::CACHE_CONTROL, "no-store")], Html(page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "dashboard",
    responses((status = 200, description = "Service is running", body = HealthResponse))
)]
#[instrument(skip(_state))]
async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/chart",
    tag = "dashboard",
    responses((status = 200, description = "Latest dashboard snapshot", body = DashboardSnapshot))
)]
#[instrument(skip(state))]
async fn get_chart(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    let snapshot = state.snapshots.borrow().clone();
    info!(
        "Serving dashboard snapshot for {:?} (has_data={})",
        snapshot.source_date,
        snapshot.has_data()
    );
    Json(snapshot)
}

#[utoipa::path(
    get,
    path = "/api/v1/series",
    tag = "dashboard",
    responses(
        (status = 200, description = "Measurements of the latest cycle", body = SeriesTable),
        (status = 404, description = "Latest cycle produced no measurements")
    )
)]
#[instrument(skip(state))]
async fn get_series(State(state): State<AppState>) -> Result<Json<SeriesTable>, StatusCode> {
    let series = state.snapshots.borrow().series.clone();
    if series.is_empty() {
        warn!("No measurements available for series request");
        return Err(StatusCode::NOT_FOUND);
    }

    info!("Serving {} measurements", series.len());
    Ok(Json(series))
}

async fn openapi_document() -> Json<utoipa::openapi::OpenApi> {
    Json(generate_openapi_spec())
}
