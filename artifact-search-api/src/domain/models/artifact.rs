use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::{AppSource, ArtifactType};

/// One normalized search result from an external application.
///
/// Identity is `(source, id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub source: AppSource,
    pub artifact_type: ArtifactType,
    pub title: String,
    pub content: String,
    pub url: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub created_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub updated_at: Option<OffsetDateTime>,
}

impl Artifact {
    pub fn new(
        id: impl Into<String>,
        source: AppSource,
        artifact_type: ArtifactType,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source,
            artifact_type,
            title: title.into(),
            content: content.into(),
            url: None,
            metadata: Map::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_timestamps(
        mut self,
        created_at: Option<OffsetDateTime>,
        updated_at: Option<OffsetDateTime>,
    ) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    /// `updated_at`, else `created_at`. `None` sorts below every instant.
    pub fn effective_timestamp(&self) -> Option<OffsetDateTime> {
        self.updated_at.or(self.created_at)
    }
}

/// Parse an RFC 3339 timestamp as returned by the connected services.
pub fn parse_timestamp(value: Option<&str>) -> Option<OffsetDateTime> {
    value.and_then(|value| OffsetDateTime::parse(value, &Rfc3339).ok())
}

/// Unified result of one search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: String,
    pub artifacts: Vec<Artifact>,
    pub sources_searched: Vec<AppSource>,
    pub total_results: usize,
    pub search_duration_ms: f64,
    pub summary: Option<String>,
}

impl SearchResult {
    pub fn empty(query: impl Into<String>, search_duration_ms: f64) -> Self {
        Self {
            query: query.into(),
            artifacts: vec![],
            sources_searched: vec![],
            total_results: 0,
            search_duration_ms,
            summary: None,
        }
    }
}
