use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::instrument;

use super::{error::validate_text, ApiError};
use crate::{
    domain::models::{SearchQuery, SearchResult},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(search))
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    context: Option<Map<String, Value>>,
}

#[instrument(name = "POST /search", skip_all)]
async fn search(
    State(app_state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResult>, ApiError> {
    let Json(request) = payload?;
    validate_text("query", &request.query)?;

    let query = SearchQuery::new(request.query).with_context(request.context.unwrap_or_default());
    Ok(Json(app_state.orchestrator.search(query).await))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::domain::{
        models::{AppSource, Artifact, ArtifactType},
        ports::outbound::MockConnector,
    };
    use crate::routes::test_support::{app, post_json};

    #[tokio::test]
    async fn search_returns_aggregated_result() {
        let app = app(vec![MockConnector::returning(
            AppSource::Notion,
            vec![Artifact::new("p1", AppSource::Notion, ArtifactType::Document, "Alarm SOP", "...")],
        )]);

        let (status, body) = post_json(app, "/search", json!({ "query": "alarm sop" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], "alarm sop");
        assert_eq!(body["total_results"], 1);
        assert_eq!(body["sources_searched"], json!(["notion"]));
        assert_eq!(body["artifacts"][0]["artifact_type"], "document");
        assert!(body["summary"].is_null());
        assert!(body["search_duration_ms"].is_number());
    }

    #[tokio::test]
    async fn search_without_connectors_is_empty_not_an_error() {
        let (status, body) = post_json(app(vec![]), "/search", json!({ "query": "anything" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_results"], 0);
        assert_eq!(body["artifacts"], json!([]));
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let (status, body) = post_json(app(vec![]), "/search", json!({ "query": "" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("query"));
    }

    #[tokio::test]
    async fn missing_query_is_rejected() {
        let (status, body) = post_json(app(vec![]), "/search", json!({ "context": {} })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}
