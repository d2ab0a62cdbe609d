use async_trait::async_trait;

use crate::domain::CompletionError;

/// A single chat-style request to a generative text service.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the service for a JSON object response.
    pub json_response: bool,
}

/// Outbound port for the generative text service used by routing and
/// summarization.
#[async_trait]
pub trait ChatCompletion: Send + Sync + 'static {
    /// Returns the text content of the first choice.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}
