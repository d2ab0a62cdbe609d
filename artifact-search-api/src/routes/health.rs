use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::instrument;

use crate::{domain::models::AppSource, AppState};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/details", get(health_details))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct DetailedHealthResponse {
    status: &'static str,
    version: &'static str,
    configured_sources: Vec<AppSource>,
    connections: BTreeMap<AppSource, bool>,
}

/// Liveness check, no upstream calls.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: VERSION,
    })
}

#[instrument(name = "GET /health/details", skip(app_state))]
async fn health_details(State(app_state): State<AppState>) -> Json<DetailedHealthResponse> {
    let report = app_state.orchestrator.connection_report().await;
    let status = if report.all_configured_reachable() {
        "healthy"
    } else {
        "degraded"
    };

    Json(DetailedHealthResponse {
        status,
        version: VERSION,
        configured_sources: report.configured_sources,
        connections: report.connections,
    })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::domain::{models::AppSource, ports::outbound::MockConnector};
    use crate::routes::test_support::{app, get_json};

    #[tokio::test]
    async fn health_is_static() {
        let (status, body) = get_json(app(vec![]), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn details_report_every_source() {
        let app = app(vec![MockConnector::returning(AppSource::Notion, vec![])]);
        let (status, body) = get_json(app, "/health/details").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["configured_sources"], json!(["notion"]));
        assert_eq!(
            body["connections"],
            json!({ "azure_devops": false, "figma": false, "notion": true, "icepanel": false })
        );
    }

    #[tokio::test]
    async fn unreachable_source_degrades_status() {
        let app = app(vec![MockConnector::returning(AppSource::Figma, vec![]).unreachable()]);
        let (_, body) = get_json(app, "/health/details").await;

        assert_eq!(body["status"], "degraded");
        assert_eq!(body["connections"]["figma"], false);
    }
}
