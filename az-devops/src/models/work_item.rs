use azure_devops_rust_api::wit::models::WorkItem as AzureWorkItem;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::Identity;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub id: i32,
    pub title: String,
    /// Raw HTML as stored by Azure DevOps.
    pub description: Option<String>,
    pub state: String,
    pub item_type: String,
    pub tags: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub changed_at: Option<OffsetDateTime>,
    pub assigned_to: Option<Identity>,
}

impl From<AzureWorkItem> for WorkItem {
    fn from(work_item: AzureWorkItem) -> Self {
        let fields = &work_item.fields;
        Self::from_fields(work_item.id, |name| fields.get(name))
    }
}

impl WorkItem {
    /// Build from a `System.*` field lookup.
    fn from_fields<'a>(id: i32, field: impl Fn(&str) -> Option<&'a Value>) -> Self {
        let string_field = |name: &str| {
            field(name)
                .and_then(|value| value.as_str())
                .map(str::to_owned)
        };
        let date_field = |name: &str| {
            field(name)
                .and_then(|value| value.as_str())
                .and_then(|value| OffsetDateTime::parse(value, &Rfc3339).ok())
        };

        Self {
            id,
            title: string_field("System.Title").unwrap_or_default(),
            description: string_field("System.Description"),
            state: string_field("System.State").unwrap_or_default(),
            item_type: string_field("System.WorkItemType").unwrap_or_default(),
            tags: string_field("System.Tags"),
            created_at: date_field("System.CreatedDate"),
            changed_at: date_field("System.ChangedDate"),
            assigned_to: field("System.AssignedTo").and_then(|value| value.try_into().ok()),
        }
    }
}
