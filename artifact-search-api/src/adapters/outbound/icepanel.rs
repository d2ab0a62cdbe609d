use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use super::http::{accept, build_client, LazyClient, MAX_RESULTS};
use crate::{
    config::IcePanelSettings,
    domain::{
        models::{parse_timestamp, AppSource, Artifact, ArtifactType, RoutedQuery},
        ports::outbound::Connector,
        ConnectorError,
    },
};

const ICEPANEL_API: &str = "https://api.icepanel.io/v1";
const ICEPANEL_APP: &str = "https://app.icepanel.io";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelObject {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "type", default)]
    object_type: String,
    #[serde(default)]
    tags: Vec<Value>,
    #[serde(default)]
    technology: Option<Value>,
    #[serde(default)]
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelObjectsResponse {
    #[serde(default)]
    model_objects: Vec<ModelObject>,
}

#[derive(Debug, Deserialize)]
struct ModelObjectResponse {
    #[serde(default)]
    data: Option<ModelObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Diagram {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "type", default)]
    view_type: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiagramsResponse {
    #[serde(default)]
    data: Vec<Diagram>,
}

/// Connector for IcePanel C4 model objects and diagrams.
pub struct IcePanelConnector {
    settings: IcePanelSettings,
    client: LazyClient<reqwest::Client>,
}

impl IcePanelConnector {
    pub fn new(settings: IcePanelSettings) -> Self {
        Self {
            settings,
            client: LazyClient::new(),
        }
    }

    async fn client(&self) -> Result<reqwest::Client, ConnectorError> {
        self.client
            .get_or_try_init(|| -> Result<reqwest::Client, ConnectorError> {
                let (api_key, _) = self.settings.credentials().ok_or_else(|| {
                    ConnectorError::Setup("IcePanel credentials missing".to_string())
                })?;
                let mut authorization = HeaderValue::from_str(&format!("ApiKey {api_key}"))
                    .map_err(|e| ConnectorError::Setup(e.to_string()))?;
                authorization.set_sensitive(true);

                let mut headers = HeaderMap::new();
                headers.insert(AUTHORIZATION, authorization);
                build_client(headers)
            })
            .await
    }

    /// GET and decode, `None` when the upstream rejects the request.
    async fn get_json<T: DeserializeOwned>(
        client: &reqwest::Client,
        url: String,
    ) -> Result<Option<T>, ConnectorError> {
        let response = client.get(url).send().await?;
        match accept(AppSource::Icepanel, response).await? {
            Some(response) => Ok(Some(response.json::<T>().await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Connector for IcePanelConnector {
    fn source(&self) -> AppSource {
        AppSource::Icepanel
    }

    fn is_configured(&self) -> bool {
        self.settings.credentials().is_some()
    }

    async fn test_connection(&self) -> bool {
        let Some((_, landscape_id)) = self.settings.credentials() else {
            return false;
        };
        let client = match self.client().await {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "IcePanel connection test failed");
                return false;
            }
        };
        match client
            .get(format!("{ICEPANEL_API}/landscapes/{landscape_id}"))
            .send()
            .await
        {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                warn!(error = %e, "IcePanel connection test failed");
                false
            }
        }
    }

    #[instrument(name = "icepanel_search", skip_all)]
    async fn search(&self, query: &RoutedQuery) -> Result<Vec<Artifact>, ConnectorError> {
        let Some((_, landscape_id)) = self.settings.credentials() else {
            return Ok(vec![]);
        };

        let client = self.client().await?;
        let base = format!("{ICEPANEL_API}/landscapes/{landscape_id}/versions/latest");
        let (objects, diagrams) = tokio::join!(
            Self::get_json::<ModelObjectsResponse>(&client, format!("{base}/model/objects")),
            Self::get_json::<DiagramsResponse>(&client, format!("{base}/diagrams")),
        );

        let terms = query.lowercase_terms();
        let mut artifacts = Vec::new();

        if let Some(objects) = objects? {
            artifacts.extend(
                objects
                    .model_objects
                    .into_iter()
                    .filter(|object| {
                        matches_any(&terms, &object.name, object.description.as_deref())
                    })
                    .map(|object| object_artifact(object, landscape_id)),
            );
        }

        if let Some(diagrams) = diagrams? {
            artifacts.extend(
                diagrams
                    .data
                    .into_iter()
                    .filter(|diagram| {
                        matches_any(&terms, &diagram.name, diagram.description.as_deref())
                    })
                    .map(|diagram| diagram_artifact(diagram, landscape_id)),
            );
        }

        debug!(count = artifacts.len(), "IcePanel matches");
        artifacts.truncate(MAX_RESULTS);
        Ok(artifacts)
    }

    async fn get_by_id(&self, artifact_id: &str) -> Result<Option<Artifact>, ConnectorError> {
        let Some((_, landscape_id)) = self.settings.credentials() else {
            return Ok(None);
        };

        let client = self.client().await?;
        let url = format!("{ICEPANEL_API}/landscapes/{landscape_id}/model-objects/{artifact_id}");
        let response = Self::get_json::<ModelObjectResponse>(&client, url).await?;

        Ok(response
            .and_then(|response| response.data)
            .map(|object| object_artifact(object, landscape_id)))
    }

    async fn close(&self) {
        if self.client.close().await {
            debug!("IcePanel client closed");
        }
    }
}

fn matches_any(terms: &[String], name: &str, description: Option<&str>) -> bool {
    let searchable = format!("{name} {}", description.unwrap_or_default()).to_lowercase();
    terms
        .iter()
        .any(|term| !term.is_empty() && searchable.contains(term.as_str()))
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|text| !text.trim().is_empty())
}

fn object_artifact(object: ModelObject, landscape_id: &str) -> Artifact {
    let mut metadata = Map::new();
    metadata.insert("object_type".into(), json!(object.object_type));
    metadata.insert("landscape_id".into(), json!(landscape_id));
    metadata.insert("tags".into(), Value::Array(object.tags));
    metadata.insert("technology".into(), object.technology.unwrap_or(Value::Null));

    let content = non_empty(object.description)
        .unwrap_or_else(|| format!("C4 {}: {}", object.object_type, object.name));

    Artifact::new(
        object.id,
        AppSource::Icepanel,
        ArtifactType::Architecture,
        object.name,
        content,
    )
    .with_url(format!("{ICEPANEL_APP}/landscapes/{landscape_id}"))
    .with_metadata(metadata)
    .with_timestamps(None, parse_timestamp(object.updated_at.as_deref()))
}

fn diagram_artifact(diagram: Diagram, landscape_id: &str) -> Artifact {
    let mut metadata = Map::new();
    metadata.insert("object_type".into(), json!("diagram"));
    metadata.insert("view_type".into(), json!(diagram.view_type));
    metadata.insert("landscape_id".into(), json!(landscape_id));

    let content = non_empty(diagram.description)
        .unwrap_or_else(|| format!("Architecture diagram: {}", diagram.name));
    let url = format!(
        "{ICEPANEL_APP}/landscapes/{landscape_id}/diagrams/{}",
        diagram.id
    );

    Artifact::new(
        diagram.id,
        AppSource::Icepanel,
        ArtifactType::Architecture,
        format!("Diagram: {}", diagram.name),
        content,
    )
    .with_url(url)
    .with_metadata(metadata)
    .with_timestamps(None, parse_timestamp(diagram.updated_at.as_deref()))
}
