use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION},
    StatusCode,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use super::http::{accept, build_client, LazyClient, MAX_RESULTS};
use crate::{
    config::NotionSettings,
    domain::{
        models::{parse_timestamp, AppSource, Artifact, ArtifactType, RoutedQuery},
        ports::outbound::Connector,
        ConnectorError,
    },
};

const NOTION_API: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

/// Connector for Notion pages and databases via the search API.
pub struct NotionConnector {
    settings: NotionSettings,
    client: LazyClient<reqwest::Client>,
}

impl NotionConnector {
    pub fn new(settings: NotionSettings) -> Self {
        Self {
            settings,
            client: LazyClient::new(),
        }
    }

    fn api_key(&self) -> Option<&str> {
        self.settings.credentials().map(|(api_key, _)| api_key)
    }

    async fn client(&self) -> Result<reqwest::Client, ConnectorError> {
        self.client
            .get_or_try_init(|| -> Result<reqwest::Client, ConnectorError> {
                let api_key = self.api_key().ok_or_else(|| {
                    ConnectorError::Setup("Notion credentials missing".to_string())
                })?;
                let mut authorization = HeaderValue::from_str(&format!("Bearer {api_key}"))
                    .map_err(|e| ConnectorError::Setup(e.to_string()))?;
                authorization.set_sensitive(true);

                let mut headers = HeaderMap::new();
                headers.insert(AUTHORIZATION, authorization);
                headers.insert(
                    HeaderName::from_static("notion-version"),
                    HeaderValue::from_static(NOTION_VERSION),
                );
                build_client(headers)
            })
            .await
    }
}

#[async_trait]
impl Connector for NotionConnector {
    fn source(&self) -> AppSource {
        AppSource::Notion
    }

    fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    async fn test_connection(&self) -> bool {
        if !self.is_configured() {
            return false;
        }
        let client = match self.client().await {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Notion connection test failed");
                return false;
            }
        };
        match client.get(format!("{NOTION_API}/users/me")).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                warn!(error = %e, "Notion connection test failed");
                false
            }
        }
    }

    #[instrument(name = "notion_search", skip_all)]
    async fn search(&self, query: &RoutedQuery) -> Result<Vec<Artifact>, ConnectorError> {
        if !self.is_configured() {
            return Ok(vec![]);
        }

        let client = self.client().await?;
        let response = client
            .post(format!("{NOTION_API}/search"))
            .json(&json!({
                "query": query.search_terms.join(" "),
                "page_size": MAX_RESULTS,
            }))
            .send()
            .await?;

        let Some(response) = accept(AppSource::Notion, response).await? else {
            return Ok(vec![]);
        };

        let data = response.json::<SearchResponse>().await?;
        debug!(count = data.results.len(), "Notion search returned results");

        let mut artifacts = data
            .results
            .iter()
            .filter_map(|result| match result["object"].as_str() {
                Some("page") => Some(page_artifact(result)),
                Some("database") => Some(database_artifact(result)),
                _ => None,
            })
            .collect::<Vec<_>>();
        artifacts.truncate(MAX_RESULTS);
        Ok(artifacts)
    }

    async fn get_by_id(&self, artifact_id: &str) -> Result<Option<Artifact>, ConnectorError> {
        if !self.is_configured() {
            return Ok(None);
        }

        let client = self.client().await?;
        let response = client
            .get(format!("{NOTION_API}/pages/{artifact_id}"))
            .send()
            .await?;

        let Some(response) = accept(AppSource::Notion, response).await? else {
            return Ok(None);
        };

        let page = response.json::<Value>().await?;
        Ok(Some(page_artifact(&page)))
    }

    async fn close(&self) {
        if self.client.close().await {
            debug!("Notion client closed");
        }
    }
}

fn plain_text(items: &Value) -> String {
    items
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["plain_text"].as_str())
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Infer the artifact type from a page's property names.
fn artifact_type_for(properties: &Map<String, Value>) -> ArtifactType {
    let names = properties
        .keys()
        .map(|name| name.to_lowercase())
        .collect::<Vec<_>>();
    let any_contains = |needles: &[&str]| {
        names
            .iter()
            .any(|name| needles.iter().any(|needle| name.contains(needle)))
    };

    if any_contains(&["risk"]) {
        ArtifactType::Risk
    } else if any_contains(&["mitigation", "control"]) {
        ArtifactType::Mitigation
    } else if any_contains(&["requirement", "req"]) {
        ArtifactType::Requirement
    } else if any_contains(&["test"]) {
        ArtifactType::TestCase
    } else {
        ArtifactType::Document
    }
}

/// `name: value` lines for text-like properties.
fn property_content(properties: &Map<String, Value>) -> String {
    properties
        .iter()
        .filter_map(|(name, property)| {
            let value = match property["type"].as_str()? {
                "rich_text" => plain_text(&property["rich_text"]),
                "select" => property["select"]["name"].as_str()?.to_string(),
                "multi_select" => property["multi_select"]
                    .as_array()?
                    .iter()
                    .filter_map(|option| option["name"].as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => return None,
            };
            (!value.is_empty()).then(|| format!("{name}: {value}"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn page_artifact(page: &Value) -> Artifact {
    let empty = Map::new();
    let properties = page["properties"].as_object().unwrap_or(&empty);

    let title = properties
        .values()
        .find(|property| property["type"] == "title")
        .map(|property| plain_text(&property["title"]))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let parent = &page["parent"];
    let parent_id = parent["database_id"]
        .as_str()
        .or_else(|| parent["page_id"].as_str());

    let mut metadata = Map::new();
    metadata.insert("parent_type".into(), parent["type"].clone());
    metadata.insert("parent_id".into(), json!(parent_id));
    metadata.insert("properties".into(), Value::Object(properties.clone()));

    let mut artifact = Artifact::new(
        page["id"].as_str().unwrap_or_default(),
        AppSource::Notion,
        artifact_type_for(properties),
        title,
        property_content(properties),
    )
    .with_metadata(metadata)
    .with_timestamps(
        parse_timestamp(page["created_time"].as_str()),
        parse_timestamp(page["last_edited_time"].as_str()),
    );
    if let Some(url) = page["url"].as_str() {
        artifact = artifact.with_url(url);
    }
    artifact
}

fn database_artifact(database: &Value) -> Artifact {
    let title = plain_text(&database["title"]);
    let description = plain_text(&database["description"]);
    let content = if description.is_empty() {
        format!("Notion database: {title}")
    } else {
        description
    };
    let title = if title.is_empty() {
        "Untitled Database".to_string()
    } else {
        title
    };

    let property_names = database["properties"]
        .as_object()
        .map(|properties| properties.keys().cloned().collect::<Vec<_>>())
        .unwrap_or_default();

    let mut metadata = Map::new();
    metadata.insert("object".into(), json!("database"));
    metadata.insert("properties".into(), json!(property_names));

    let mut artifact = Artifact::new(
        database["id"].as_str().unwrap_or_default(),
        AppSource::Notion,
        ArtifactType::Document,
        title,
        content,
    )
    .with_metadata(metadata)
    .with_timestamps(
        parse_timestamp(database["created_time"].as_str()),
        parse_timestamp(database["last_edited_time"].as_str()),
    );
    if let Some(url) = database["url"].as_str() {
        artifact = artifact.with_url(url);
    }
    artifact
}
