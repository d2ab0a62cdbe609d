use std::sync::Arc;

use azure_devops_rust_api::Credential;
use azure_identity::AzureCliCredential;

/// Credential backed by the signed-in Azure CLI.
pub fn developer_credential() -> azure_core::Result<Credential> {
    tracing::debug!("Authenticate using AzureCliCredential");
    let cli_credential = AzureCliCredential::new(None)?;
    Ok(Credential::from_token_credential(cli_credential))
}

/// `Authorization` header value for `scope`, e.g.
/// `https://cognitiveservices.azure.com/.default`.
pub async fn authorization_header(
    credential: &Credential,
    scope: &str,
) -> azure_core::Result<Option<String>> {
    credential.http_authorization_header(&[scope]).await
}
