use std::time::Duration;

use thiserror::Error;

/// Errors raised by a connector's search or point lookup.
///
/// Ordinary "no results" and upstream 4xx responses are not errors; connectors
/// return empty results for those.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("client setup failed: {0}")]
    Setup(String),
}

impl From<reqwest::Error> for ConnectorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ConnectorError::Parse(e.to_string())
        } else {
            ConnectorError::Request(e.to_string())
        }
    }
}

impl From<az_devops::WorkItemClientError> for ConnectorError {
    fn from(e: az_devops::WorkItemClientError) -> Self {
        match e.status() {
            Some(status) => ConnectorError::Upstream {
                status,
                message: e.to_string(),
            },
            None => match e {
                az_devops::WorkItemClientError::InvalidOrganization(_) => {
                    ConnectorError::Setup(e.to_string())
                }
                _ => ConnectorError::Request(e.to_string()),
            },
        }
    }
}

/// Errors from the external generative-text service.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion service not configured")]
    NotConfigured,
    #[error("request failed: {0}")]
    Request(String),
    #[error("service returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("empty completion response")]
    EmptyResponse,
    #[error("could not acquire credential: {0}")]
    Credential(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        CompletionError::Request(e.to_string())
    }
}
