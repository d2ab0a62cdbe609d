use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use serde::{de::IgnoredAny, Deserialize, Serialize};
use tracing::instrument;

use super::{error::validate_text, ApiError};
use crate::{
    domain::models::{AppSource, Artifact, ArtifactType},
    AppState,
};

const CHAT_ARTIFACT_LIMIT: usize = 10;
const CHAT_CONTENT_CHARS: usize = 500;
const DEFAULT_REPLY: &str = "Here's what I found:";

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(chat))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    /// Accepted for client compatibility; searches use the latest message only
    #[serde(rename = "history", default)]
    _history: IgnoredAny,
}

#[derive(Debug, Serialize)]
struct ChatArtifact {
    id: String,
    source: AppSource,
    #[serde(rename = "type")]
    artifact_type: ArtifactType,
    title: String,
    content: String,
    url: Option<String>,
}

impl From<Artifact> for ChatArtifact {
    fn from(artifact: Artifact) -> Self {
        let content = artifact.content.chars().take(CHAT_CONTENT_CHARS).collect();
        Self {
            id: artifact.id,
            source: artifact.source,
            artifact_type: artifact.artifact_type,
            title: artifact.title,
            content,
            url: artifact.url,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    message: String,
    artifacts: Vec<ChatArtifact>,
    sources_searched: Vec<AppSource>,
    total_results: usize,
}

#[instrument(name = "POST /chat", skip_all)]
async fn chat(
    State(app_state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;
    validate_text("message", &request.message)?;

    let result = app_state.orchestrator.search(request.message).await;

    Ok(Json(ChatResponse {
        message: result.summary.unwrap_or_else(|| DEFAULT_REPLY.to_string()),
        artifacts: result
            .artifacts
            .into_iter()
            .take(CHAT_ARTIFACT_LIMIT)
            .map(ChatArtifact::from)
            .collect(),
        sources_searched: result.sources_searched,
        total_results: result.total_results,
    }))
}
