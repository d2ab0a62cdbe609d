use std::str::FromStr;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::ApiError;
use crate::{
    domain::models::{AppSource, Artifact},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/:source/:artifact_id", get(get_artifact))
}

#[instrument(name = "GET /artifact", skip(app_state))]
async fn get_artifact(
    State(app_state): State<AppState>,
    Path((source, artifact_id)): Path<(String, String)>,
) -> Result<Json<Artifact>, ApiError> {
    let source = AppSource::from_str(&source)
        .map_err(|_| ApiError::bad_request(format!("Invalid source: {source}")))?;

    app_state
        .orchestrator
        .get_artifact(source, &artifact_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Artifact not found"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;

    use crate::domain::{
        models::{AppSource, Artifact, ArtifactType},
        ports::outbound::MockConnector,
    };
    use crate::routes::test_support::{app, get_json};

    fn notion() -> MockConnector {
        MockConnector::returning(
            AppSource::Notion,
            vec![Artifact::new("page-1", AppSource::Notion, ArtifactType::Document, "SOP", "...")],
        )
    }

    #[tokio::test]
    async fn artifact_is_fetched_by_source_and_id() {
        let (status, body) = get_json(app(vec![notion()]), "/artifact/notion/page-1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "page-1");
        assert_eq!(body["source"], "notion");
    }

    #[tokio::test]
    async fn unknown_source_is_bad_request() {
        let (status, body) = get_json(app(vec![notion()]), "/artifact/jira/1").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid source: jira");
    }

    #[tokio::test]
    async fn missing_artifact_is_not_found() {
        let (status, _) = get_json(app(vec![notion()]), "/artifact/notion/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get_json(app(vec![notion()]), "/artifact/figma/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_lookup_is_bad_gateway() {
        let app = app(vec![MockConnector::delayed(
            AppSource::Notion,
            Duration::from_secs(3600),
            vec![],
        )]);

        let (status, body) = get_json(app, "/artifact/notion/page-1").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn connector_failure_is_bad_gateway() {
        let app = app(vec![MockConnector::failing(AppSource::Notion, "down")]);
        let (status, _) = get_json(app, "/artifact/notion/page-1").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
