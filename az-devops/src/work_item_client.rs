use azure_devops_rust_api::{
    wit::{self, models::Wiql},
    Credential,
};
use thiserror::Error;

use crate::models::WorkItem;

const PING_QUERY: &str = "SELECT [System.Id] FROM WorkItems WHERE [System.TeamProject] = @project";

#[derive(Error, Debug)]
pub enum WorkItemClientError {
    #[error("Azure DevOps request failed: {0}")]
    Azure(#[from] azure_core::Error),
    #[error("Invalid organization URL `{0}`")]
    InvalidOrganization(String),
    #[error("Invalid work item id `{0}`")]
    InvalidId(String),
}

impl WorkItemClientError {
    /// HTTP status returned by the service, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Azure(e) => e.http_status().map(u16::from),
            _ => None,
        }
    }

    /// Whether the service rejected the request itself (4xx) rather than failing.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::InvalidId(_) => true,
            _ => self
                .status()
                .is_some_and(|status| (400..500).contains(&status)),
        }
    }
}

/// Project-scoped Azure DevOps work item client authenticated with a PAT.
#[derive(Clone)]
pub struct WorkItemClient {
    client: wit::Client,
    organization_url: String,
    organization: String,
    project: String,
}

impl WorkItemClient {
    pub fn new(
        organization_url: &str,
        project: &str,
        pat: &str,
    ) -> Result<Self, WorkItemClientError> {
        let organization_url = organization_url.trim().trim_end_matches('/');
        let organization = organization_from_url(organization_url)
            .ok_or_else(|| WorkItemClientError::InvalidOrganization(organization_url.to_owned()))?;

        let credential = Credential::from_pat(pat.to_owned());
        let client = wit::ClientBuilder::new(credential).build();

        Ok(Self {
            client,
            organization_url: organization_url.to_owned(),
            organization,
            project: project.to_owned(),
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Browser URL of a work item (not the REST resource URL).
    pub fn work_item_web_url(&self, id: i32) -> String {
        format!(
            "{}/{}/_workitems/edit/{}",
            self.organization_url, self.project, id
        )
    }

    /// Run a WIQL query and return the matching work item IDs in query order.
    pub async fn query_work_item_ids(&self, wiql: &str) -> Result<Vec<i32>, WorkItemClientError> {
        tracing::debug!(wiql_query = %wiql, "Executing WIQL query");

        let result = self
            .client
            .wiql_client()
            .query_by_wiql(
                &self.organization,
                Wiql {
                    query: Some(wiql.to_owned()),
                },
                &self.project,
                "",
            )
            .await?;

        Ok(result
            .work_items
            .into_iter()
            .filter_map(|reference| Option::<i32>::from(reference.id))
            .collect())
    }

    /// Fetch full work items for a batch of IDs, in the order given.
    pub async fn get_work_items(&self, ids: &[i32]) -> Result<Vec<WorkItem>, WorkItemClientError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let ids_param = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let work_items = self
            .client
            .work_items_client()
            .list(&self.organization, ids_param, &self.project)
            .await?
            .value;

        Ok(work_items.into_iter().map(WorkItem::from).collect())
    }

    /// Fetch a single work item by its numeric ID.
    pub async fn get_work_item(&self, id: &str) -> Result<Option<WorkItem>, WorkItemClientError> {
        let id = id
            .trim()
            .parse::<i32>()
            .map_err(|_| WorkItemClientError::InvalidId(id.to_owned()))?;

        let work_item = self
            .client
            .work_items_client()
            .get_work_item(&self.organization, id, &self.project)
            .await?;

        Ok(Some(WorkItem::from(work_item)))
    }

    /// Lightweight round-trip to verify credentials and reachability.
    pub async fn ping(&self) -> Result<bool, WorkItemClientError> {
        self.client
            .wiql_client()
            .query_by_wiql(
                &self.organization,
                Wiql {
                    query: Some(PING_QUERY.to_owned()),
                },
                &self.project,
                "",
            )
            .top(1)
            .await?;
        Ok(true)
    }
}

/// Organization name from `https://dev.azure.com/{org}` or `https://{org}.visualstudio.com`.
pub fn organization_from_url(organization_url: &str) -> Option<String> {
    let without_scheme = organization_url
        .trim()
        .trim_end_matches('/')
        .split_once("://")
        .map_or(organization_url, |(_, rest)| rest);

    let mut segments = without_scheme.split('/');
    let host = segments.next()?;
    let organization = match segments.next() {
        Some(segment) if !segment.is_empty() => segment,
        _ => host.strip_suffix(".visualstudio.com")?,
    };

    (!organization.is_empty()).then(|| organization.to_owned())
}
