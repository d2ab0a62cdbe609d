use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};
use url::Url;

use crate::{
    config::AzureAiSettings,
    domain::{
        ports::outbound::{ChatCompletion, CompletionRequest},
        CompletionError,
    },
};

const COGNITIVE_SERVICES_SCOPE: &str = "https://cognitiveservices.azure.com/.default";
const TOKEN_TTL: Duration = Duration::from_secs(300);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

enum Credential {
    ApiKey(String),
    /// Azure CLI sign-in; the bearer header is cached briefly
    Developer {
        credential: az_devops::Credential,
        headers: Cache<&'static str, String>,
    },
}

/// Chat completions against an Azure OpenAI deployment.
pub struct AzureOpenAiClient {
    http: reqwest::Client,
    url: Url,
    credential: Credential,
}

impl AzureOpenAiClient {
    pub fn new(settings: &AzureAiSettings) -> Result<Self, CompletionError> {
        let endpoint = settings
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .ok_or(CompletionError::NotConfigured)?;

        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty());
        let credential = match api_key {
            Some(key) => Credential::ApiKey(key.to_string()),
            None if settings.use_ad_auth => Credential::Developer {
                credential: az_devops::developer_credential()
                    .map_err(|e| CompletionError::Credential(e.to_string()))?,
                headers: Cache::builder().time_to_live(TOKEN_TTL).build(),
            },
            None => return Err(CompletionError::NotConfigured),
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            url: completions_url(endpoint, &settings.deployment, &settings.api_version)?,
            credential,
        })
    }

    async fn auth_header(&self) -> Result<(HeaderName, HeaderValue), CompletionError> {
        let (name, value) = match &self.credential {
            Credential::ApiKey(key) => (HeaderName::from_static("api-key"), key.clone()),
            Credential::Developer {
                credential,
                headers,
            } => {
                let header = match headers.get(COGNITIVE_SERVICES_SCOPE) {
                    Some(header) => header,
                    None => {
                        let header = bearer_header(credential).await?;
                        headers.insert(COGNITIVE_SERVICES_SCOPE, header.clone());
                        header
                    }
                };
                (AUTHORIZATION, header)
            }
        };

        let mut value =
            HeaderValue::from_str(&value).map_err(|e| CompletionError::Credential(e.to_string()))?;
        value.set_sensitive(true);
        Ok((name, value))
    }
}

#[async_trait]
impl ChatCompletion for AzureOpenAiClient {
    #[instrument(skip_all, fields(max_tokens = request.max_tokens))]
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let (header, value) = self.auth_header().await?;

        let response = self
            .http
            .post(self.url.clone())
            .header(header, value)
            .json(&request_body(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let content = first_choice_content(response.json::<ChatResponse>().await?)?;
        debug!(chars = content.len(), "Completion received");
        Ok(content)
    }
}

/// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version=…`
fn completions_url(
    endpoint: &str,
    deployment: &str,
    api_version: &str,
) -> Result<Url, CompletionError> {
    let base = format!("{}/", endpoint.trim_end_matches('/'));
    let mut url = Url::parse(&base)
        .and_then(|base| base.join(&format!("openai/deployments/{deployment}/chat/completions")))
        .map_err(|e| CompletionError::Request(format!("invalid endpoint: {e}")))?;
    url.query_pairs_mut().append_pair("api-version", api_version);
    Ok(url)
}

fn request_body(request: &CompletionRequest) -> Value {
    let mut body = json!({
        "messages": [
            { "role": "system", "content": request.system },
            { "role": "user", "content": request.user },
        ],
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
    });
    if request.json_response {
        body["response_format"] = json!({ "type": "json_object" });
    }
    body
}

fn first_choice_content(response: ChatResponse) -> Result<String, CompletionError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(CompletionError::EmptyResponse)
}

/// Bearer `Authorization` value for Azure OpenAI from the signed-in Azure CLI.
async fn bearer_header(credential: &az_devops::Credential) -> Result<String, CompletionError> {
    debug!("Requesting Azure OpenAI token from Azure CLI credential");
    az_devops::authorization_header(credential, COGNITIVE_SERVICES_SCOPE)
        .await
        .map_err(|e| CompletionError::Credential(e.to_string()))?
        .ok_or_else(|| CompletionError::Credential("credential produced no token".to_string()))
}
