use crate::config::Config;
use crate::pipeline::IntelligenceService;
use crate::{Error, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// HTTP front end for the report, sync, and smart-search operations.
pub struct Server {
    config: Arc<Config>,
}

struct AppState {
    service: IntelligenceService,
}

impl Server {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let service = IntelligenceService::from_config(&self.config)?;
        let state = Arc::new(AppState { service });

        let app = router(state);

        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Service(format!("Failed to bind {addr}: {e}")))?;

        info!("Listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Service(format!("Server error: {e}")))?;

        info!("Server shutdown complete");
        Ok(())
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/generate-report", get(generate_report))
        .route("/generate-report/markdown", get(generate_report_markdown))
        .route("/sync-sheet", post(sync_sheet))
        .route("/smart-search", post(smart_search))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(sig) => sig,
        Err(e) => {
            error!("Failed to setup SIGTERM handler: {}", e);
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = signal::ctrl_c() => {
            info!("Received SIGINT, initiating graceful shutdown");
        }
    }
}

/// Errors become `{"detail": ...}` bodies, mirroring validation failures
/// with a 400 and everything else with a 500.
struct ApiError(Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

#[derive(Debug, Deserialize)]
struct ReportParams {
    query: String,
    months_back: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SyncParams {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct SmartSearchRequest {
    case_description: String,
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Surgical Scout is running." }))
}

async fn generate_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportParams>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let report = state
        .service
        .generate_report(&params.query, params.months_back)
        .await?;
    Ok(Json(report))
}

async fn generate_report_markdown(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportParams>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let report = state
        .service
        .generate_report(&params.query, params.months_back)
        .await?;
    Ok(report.to_markdown())
}

async fn sync_sheet(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SyncParams>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let outcome = state.service.sync_sheet(params.limit.unwrap_or(5)).await?;
    Ok(Json(outcome))
}

async fn smart_search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SmartSearchRequest>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let outcome = state.service.smart_search(&request.case_description).await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_params_deserialize() {
        let params: ReportParams =
            serde_urlencoded::from_str("query=Nanofat&months_back=12").unwrap();
        assert_eq!(params.query, "Nanofat");
        assert_eq!(params.months_back, Some(12));

        let params: ReportParams = serde_urlencoded::from_str("query=Nanofat").unwrap();
        assert_eq!(params.months_back, None);
    }

    #[test]
    fn test_invalid_input_maps_to_400() {
        let response = ApiError(Error::InvalidInput {
            field: "case_description".to_string(),
            reason: "cannot be empty".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_other_errors_map_to_500() {
        let response = ApiError(Error::Service("boom".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
