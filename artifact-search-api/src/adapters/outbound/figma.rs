use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER},
    Response, StatusCode,
};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use super::http::{accept, build_client, LazyClient, MAX_RESULTS};
use crate::{
    config::FigmaSettings,
    domain::{
        models::{parse_timestamp, AppSource, Artifact, ArtifactType, RoutedQuery},
        ports::outbound::Connector,
        ConnectorError,
    },
};

const FIGMA_API: &str = "https://api.figma.com/v1";
const FILE_CACHE_TTL: Duration = Duration::from_secs(300);
const MAX_ATTEMPTS: u32 = 3;
/// Upper bound on any single wait between attempts, including `Retry-After`.
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const DESIGN_NODE_TYPES: &[&str] = &["FRAME", "COMPONENT", "COMPONENT_SET", "SECTION"];

/// Connector walking a single Figma file's node tree.
pub struct FigmaConnector {
    settings: FigmaSettings,
    client: LazyClient<reqwest::Client>,
    files: Cache<String, Arc<Value>>,
}

impl FigmaConnector {
    pub fn new(settings: FigmaSettings) -> Self {
        Self {
            settings,
            client: LazyClient::new(),
            files: Cache::builder().time_to_live(FILE_CACHE_TTL).build(),
        }
    }

    async fn client(&self) -> Result<reqwest::Client, ConnectorError> {
        self.client
            .get_or_try_init(|| -> Result<reqwest::Client, ConnectorError> {
                let (token, _) = self.settings.credentials().ok_or_else(|| {
                    ConnectorError::Setup("Figma credentials missing".to_string())
                })?;
                let mut token = HeaderValue::from_str(token)
                    .map_err(|e| ConnectorError::Setup(e.to_string()))?;
                token.set_sensitive(true);

                let mut headers = HeaderMap::new();
                headers.insert(HeaderName::from_static("x-figma-token"), token);
                build_client(headers)
            })
            .await
    }

    /// GET with up to three attempts on 429, 5xx and timeouts.
    async fn get_with_retry(
        &self,
        client: &reqwest::Client,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<Response>, ConnectorError> {
        let mut last_error = None;

        for attempt in 0..MAX_ATTEMPTS {
            let is_last = attempt + 1 == MAX_ATTEMPTS;
            match client.get(url).query(query).send().await {
                Ok(response) if is_retryable(response.status()) => {
                    let status = response.status();
                    let delay = backoff_delay(attempt, retry_after_secs(&response));
                    warn!(
                        status = status.as_u16(),
                        attempt = attempt + 1,
                        ?delay,
                        "Figma request throttled or failed, retrying"
                    );
                    last_error = Some(ConnectorError::Upstream {
                        status: status.as_u16(),
                        message: response.text().await.unwrap_or_default(),
                    });
                    if !is_last {
                        tokio::time::sleep(delay).await;
                    }
                }
                Ok(response) => return accept(AppSource::Figma, response).await,
                Err(e) if e.is_timeout() => {
                    let delay = backoff_delay(attempt, None);
                    warn!(attempt = attempt + 1, ?delay, "Figma request timed out, retrying");
                    last_error = Some(e.into());
                    if !is_last {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ConnectorError::Request(format!("Figma request failed after {MAX_ATTEMPTS} attempts"))
        }))
    }

    /// File document, served from cache for five minutes.
    async fn file(
        &self,
        client: &reqwest::Client,
        file_key: &str,
    ) -> Result<Option<Arc<Value>>, ConnectorError> {
        if let Some(file) = self.files.get(file_key) {
            debug!(file_key, "Using cached Figma file");
            return Ok(Some(file));
        }

        let url = format!("{FIGMA_API}/files/{file_key}");
        let Some(response) = self.get_with_retry(client, &url, &[]).await? else {
            return Ok(None);
        };

        let file = Arc::new(response.json::<Value>().await?);
        self.files.insert(file_key.to_string(), Arc::clone(&file));
        debug!(file_key, "Cached Figma file");
        Ok(Some(file))
    }
}

#[async_trait]
impl Connector for FigmaConnector {
    fn source(&self) -> AppSource {
        AppSource::Figma
    }

    fn is_configured(&self) -> bool {
        self.settings.credentials().is_some()
    }

    async fn test_connection(&self) -> bool {
        if !self.is_configured() {
            return false;
        }
        let client = match self.client().await {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Figma connection test failed");
                return false;
            }
        };
        match client.get(format!("{FIGMA_API}/me")).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                warn!(error = %e, "Figma connection test failed");
                false
            }
        }
    }

    #[instrument(name = "figma_search", skip_all)]
    async fn search(&self, query: &RoutedQuery) -> Result<Vec<Artifact>, ConnectorError> {
        let Some((_, file_key)) = self.settings.credentials() else {
            return Ok(vec![]);
        };

        let client = self.client().await?;
        let Some(file) = self.file(&client, file_key).await? else {
            return Ok(vec![]);
        };

        let mut artifacts = design_artifacts(&file, file_key, &query.lowercase_terms());
        artifacts.truncate(MAX_RESULTS);
        Ok(artifacts)
    }

    async fn get_by_id(&self, artifact_id: &str) -> Result<Option<Artifact>, ConnectorError> {
        let Some((_, file_key)) = self.settings.credentials() else {
            return Ok(None);
        };

        let client = self.client().await?;
        let url = format!("{FIGMA_API}/files/{file_key}/nodes");
        let Some(response) = self
            .get_with_retry(&client, &url, &[("ids", artifact_id)])
            .await?
        else {
            return Ok(None);
        };

        let data = response.json::<Value>().await?;
        Ok(node_artifact(&data, file_key, artifact_id))
    }

    async fn close(&self) {
        if self.client.close().await {
            debug!("Figma client closed");
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// 1, 2, 4 seconds, or the server's `Retry-After` when that is longer,
/// never more than [`MAX_BACKOFF`].
fn backoff_delay(attempt: u32, retry_after_secs: Option<u64>) -> Duration {
    let base = 1u64 << attempt.min(16);
    Duration::from_secs(retry_after_secs.map_or(base, |secs| secs.max(base))).min(MAX_BACKOFF)
}

fn node_url(file_key: &str, node_id: &str) -> String {
    format!("https://www.figma.com/file/{file_key}?node-id={node_id}")
}

/// Depth-first walk collecting design nodes whose name contains any term.
fn design_artifacts(file: &Value, file_key: &str, terms: &[String]) -> Vec<Artifact> {
    let file_name = file["name"].as_str().unwrap_or_default();
    let updated_at = parse_timestamp(file["lastModified"].as_str());

    let mut artifacts = Vec::new();
    let mut visit = |node: &Value, path: &str| {
        let name = node["name"].as_str().unwrap_or_default();
        let node_type = node["type"].as_str().unwrap_or_default();
        let name_lower = name.to_lowercase();

        let is_match = terms
            .iter()
            .any(|term| !term.is_empty() && name_lower.contains(term.as_str()));
        if !is_match || !DESIGN_NODE_TYPES.contains(&node_type) {
            return;
        }

        let id = node["id"].as_str().unwrap_or_default();
        let mut metadata = Map::new();
        metadata.insert("node_type".into(), json!(node_type));
        metadata.insert("path".into(), json!(path));
        metadata.insert("file_key".into(), json!(file_key));
        metadata.insert("file_name".into(), json!(file_name));

        artifacts.push(
            Artifact::new(
                id,
                AppSource::Figma,
                ArtifactType::Design,
                name,
                format!("Figma {node_type}: {path}"),
            )
            .with_url(node_url(file_key, id))
            .with_metadata(metadata)
            .with_timestamps(None, updated_at),
        );
    };

    walk(&file["document"], "", &mut visit);
    artifacts
}

fn walk(node: &Value, parent_path: &str, visit: &mut impl FnMut(&Value, &str)) {
    if !node.is_object() {
        return;
    }

    let name = node["name"].as_str().unwrap_or_default();
    let path = if parent_path.is_empty() {
        name.to_string()
    } else {
        format!("{parent_path}/{name}")
    };

    visit(node, &path);

    if let Some(children) = node["children"].as_array() {
        for child in children {
            walk(child, &path, visit);
        }
    }
}

/// Artifact for one node from a `/files/{key}/nodes` response.
fn node_artifact(data: &Value, file_key: &str, node_id: &str) -> Option<Artifact> {
    let node = data["nodes"].get(node_id)?.get("document")?;
    if !node.is_object() {
        return None;
    }

    let name = node["name"].as_str().unwrap_or_default();
    let node_type = node["type"].as_str().unwrap_or_default();

    let mut metadata = Map::new();
    metadata.insert("node_type".into(), json!(node_type));
    metadata.insert("file_key".into(), json!(file_key));

    Some(
        Artifact::new(
            node_id,
            AppSource::Figma,
            ArtifactType::Design,
            name,
            format!("Figma {node_type}: {name}"),
        )
        .with_url(node_url(file_key, node_id))
        .with_metadata(metadata)
        .with_timestamps(None, parse_timestamp(data["lastModified"].as_str())),
    )
}
