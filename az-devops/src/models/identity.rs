use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub unique_name: String,
    pub avatar_url: Option<String>,
}

/// Identity shape embedded in work item fields such as `System.AssignedTo`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkItemIdentity {
    #[serde(default)]
    id: String,
    display_name: String,
    #[serde(default)]
    unique_name: String,
    #[serde(rename = "imageUrl")]
    avatar_url: Option<String>,
}

impl From<WorkItemIdentity> for Identity {
    fn from(identity: WorkItemIdentity) -> Self {
        Self {
            id: identity.id,
            display_name: identity.display_name,
            unique_name: identity.unique_name,
            avatar_url: identity.avatar_url,
        }
    }
}

impl TryFrom<&Value> for Identity {
    type Error = serde_json::Error;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        serde_json::from_value::<WorkItemIdentity>(value.clone()).map(Self::from)
    }
}
