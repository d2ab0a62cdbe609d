mod credential;
mod models;
mod wiql;
mod work_item_client;

pub use azure_devops_rust_api::Credential;
pub use credential::{authorization_header, developer_credential};
pub use models::*;
pub use wiql::{escape_single_quoted, text_search_query};
pub use work_item_client::{organization_from_url, WorkItemClient, WorkItemClientError};
