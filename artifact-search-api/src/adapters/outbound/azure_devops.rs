use async_trait::async_trait;
use az_devops::{text_search_query, WorkItem, WorkItemClient, WorkItemClientError};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use super::http::{LazyClient, MAX_RESULTS};
use crate::{
    config::AzureDevOpsSettings,
    domain::{
        models::{AppSource, Artifact, ArtifactType, RoutedQuery},
        ports::outbound::Connector,
        ConnectorError,
    },
};

/// Connector searching Azure DevOps work items with WIQL.
pub struct AzureDevOpsConnector {
    settings: AzureDevOpsSettings,
    client: LazyClient<WorkItemClient>,
}

impl AzureDevOpsConnector {
    pub fn new(settings: AzureDevOpsSettings) -> Self {
        Self {
            settings,
            client: LazyClient::new(),
        }
    }

    async fn client(&self) -> Result<WorkItemClient, ConnectorError> {
        self.client
            .get_or_try_init(|| -> Result<WorkItemClient, ConnectorError> {
                let (org_url, pat) = self.settings.credentials().ok_or_else(|| {
                    ConnectorError::Setup("Azure DevOps credentials missing".to_string())
                })?;
                debug!("Creating Azure DevOps client");
                Ok(WorkItemClient::new(org_url, &self.settings.project, pat)?)
            })
            .await
    }
}

/// Turn 4xx rejections into "nothing found".
fn rejected_as_empty<T: Default>(
    result: Result<T, WorkItemClientError>,
) -> Result<T, ConnectorError> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_client_error() => {
            warn!(source = %AppSource::AzureDevops, error = %e, "Request rejected by upstream");
            Ok(T::default())
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl Connector for AzureDevOpsConnector {
    fn source(&self) -> AppSource {
        AppSource::AzureDevops
    }

    fn is_configured(&self) -> bool {
        self.settings.credentials().is_some()
    }

    async fn test_connection(&self) -> bool {
        if !self.is_configured() {
            return false;
        }
        let result = match self.client().await {
            Ok(client) => client.ping().await.map_err(ConnectorError::from),
            Err(e) => Err(e),
        };
        match result {
            Ok(reachable) => reachable,
            Err(e) => {
                warn!(error = %e, "Azure DevOps connection test failed");
                false
            }
        }
    }

    #[instrument(name = "azure_devops_search", skip_all)]
    async fn search(&self, query: &RoutedQuery) -> Result<Vec<Artifact>, ConnectorError> {
        if !self.is_configured() {
            return Ok(vec![]);
        }

        let client = self.client().await?;
        let Some(wiql) = text_search_query(client.project(), &query.search_terms) else {
            return Ok(vec![]);
        };

        let mut ids = rejected_as_empty(client.query_work_item_ids(&wiql).await)?;
        ids.truncate(MAX_RESULTS);

        let work_items = rejected_as_empty(client.get_work_items(&ids).await)?;
        debug!(count = work_items.len(), "Fetched work items");

        Ok(work_items
            .into_iter()
            .map(|work_item| {
                let url = client.work_item_web_url(work_item.id);
                to_artifact(work_item, url)
            })
            .collect())
    }

    async fn get_by_id(&self, artifact_id: &str) -> Result<Option<Artifact>, ConnectorError> {
        if !self.is_configured() {
            return Ok(None);
        }

        let client = self.client().await?;
        let work_item = rejected_as_empty(client.get_work_item(artifact_id).await)?;

        Ok(work_item.map(|work_item| {
            let url = client.work_item_web_url(work_item.id);
            to_artifact(work_item, url)
        }))
    }

    async fn close(&self) {
        if self.client.close().await {
            debug!("Azure DevOps client closed");
        }
    }
}

pub(crate) fn artifact_type_for(work_item_type: &str) -> ArtifactType {
    match work_item_type {
        "Bug" | "Task" => ArtifactType::WorkItem,
        "User Story" | "Feature" | "Epic" => ArtifactType::Requirement,
        "Test Case" => ArtifactType::TestCase,
        "Risk" => ArtifactType::Risk,
        "Mitigation" => ArtifactType::Mitigation,
        _ => ArtifactType::WorkItem,
    }
}

/// Convert HTML to Markdown using htmd.
fn html_to_markdown(html: &str) -> String {
    htmd::convert(html).unwrap_or_else(|_| html.to_string())
}

pub(crate) fn to_artifact(work_item: WorkItem, url: String) -> Artifact {
    let mut metadata = Map::new();
    metadata.insert("work_item_type".into(), json!(work_item.item_type));
    metadata.insert("state".into(), json!(work_item.state));
    metadata.insert(
        "assigned_to".into(),
        work_item
            .assigned_to
            .as_ref()
            .map(|identity| json!(identity.display_name))
            .unwrap_or(Value::Null),
    );
    metadata.insert("tags".into(), json!(work_item.tags));

    let content = work_item
        .description
        .as_deref()
        .map(html_to_markdown)
        .unwrap_or_default();

    Artifact::new(
        work_item.id.to_string(),
        AppSource::AzureDevops,
        artifact_type_for(&work_item.item_type),
        work_item.title,
        content,
    )
    .with_url(url)
    .with_metadata(metadata)
    .with_timestamps(work_item.created_at, work_item.changed_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use az_devops::Identity;
    use time::macros::datetime;

    fn work_item(item_type: &str) -> WorkItem {
        WorkItem {
            id: 42,
            title: "Alarm fatigue".to_string(),
            description: Some("<p>Too many <strong>alerts</strong></p>".to_string()),
            state: "Active".to_string(),
            item_type: item_type.to_string(),
            tags: Some("alarms; iso14971".to_string()),
            created_at: Some(datetime!(2024-01-01 10:00 UTC)),
            changed_at: Some(datetime!(2024-03-01 8:30 UTC)),
            assigned_to: Some(Identity {
                id: "u1".to_string(),
                display_name: "Ada Lovelace".to_string(),
                unique_name: "ada@contoso.com".to_string(),
                avatar_url: None,
            }),
        }
    }

    #[test]
    fn work_item_types_map_to_artifact_types() {
        assert_eq!(artifact_type_for("Bug"), ArtifactType::WorkItem);
        assert_eq!(artifact_type_for("Task"), ArtifactType::WorkItem);
        assert_eq!(artifact_type_for("User Story"), ArtifactType::Requirement);
        assert_eq!(artifact_type_for("Epic"), ArtifactType::Requirement);
        assert_eq!(artifact_type_for("Test Case"), ArtifactType::TestCase);
        assert_eq!(artifact_type_for("Risk"), ArtifactType::Risk);
        assert_eq!(artifact_type_for("Mitigation"), ArtifactType::Mitigation);
        assert_eq!(artifact_type_for("Impediment"), ArtifactType::WorkItem);
    }

    #[test]
    fn work_item_converts_to_artifact() {
        let artifact = to_artifact(
            work_item("Risk"),
            "https://dev.azure.com/contoso/RiskManagement/_workitems/edit/42".to_string(),
        );

        assert_eq!(artifact.id, "42");
        assert_eq!(artifact.source, AppSource::AzureDevops);
        assert_eq!(artifact.artifact_type, ArtifactType::Risk);
        assert_eq!(artifact.title, "Alarm fatigue");
        assert!(artifact.content.contains("alerts"));
        assert!(!artifact.content.contains("<p>"));
        assert_eq!(artifact.metadata["state"], "Active");
        assert_eq!(artifact.metadata["assigned_to"], "Ada Lovelace");
        assert_eq!(artifact.metadata["work_item_type"], "Risk");
        assert_eq!(artifact.metadata["tags"], "alarms; iso14971");
        assert_eq!(
            artifact.effective_timestamp(),
            Some(datetime!(2024-03-01 8:30 UTC))
        );
    }

    #[test]
    fn missing_description_yields_empty_content() {
        let mut item = work_item("Task");
        item.description = None;
        item.assigned_to = None;

        let artifact = to_artifact(item, String::new());

        assert_eq!(artifact.content, "");
        assert!(artifact.metadata["assigned_to"].is_null());
    }

    #[test]
    fn connector_requires_org_and_pat() {
        let connector = AzureDevOpsConnector::new(AzureDevOpsSettings {
            org_url: Some("https://dev.azure.com/contoso".into()),
            pat: None,
            project: "RiskManagement".into(),
        });
        assert!(!connector.is_configured());

        let connector = AzureDevOpsConnector::new(AzureDevOpsSettings {
            org_url: Some("https://dev.azure.com/contoso".into()),
            pat: Some("secret".into()),
            project: "RiskManagement".into(),
        });
        assert!(connector.is_configured());
    }

    #[tokio::test]
    async fn unconfigured_connector_returns_nothing() {
        let connector = AzureDevOpsConnector::new(AzureDevOpsSettings::default());
        let query = RoutedQuery {
            original_query: "alarm".into(),
            target_apps: vec![AppSource::AzureDevops],
            artifact_types: vec![ArtifactType::Risk],
            search_terms: vec!["alarm".into()],
        };

        assert!(connector.search(&query).await.unwrap().is_empty());
        assert_eq!(connector.get_by_id("1").await.unwrap(), None);
        assert!(!connector.test_connection().await);
        connector.close().await;
    }
}
