//! Short natural-language summary of a result set.

use std::sync::Arc;

use tracing::warn;

use super::{
    models::Artifact,
    ports::outbound::{ChatCompletion, CompletionRequest},
    CompletionError, Outcome,
};

const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful assistant summarizing search results \
for a MedTech risk management system. Provide a brief, informative summary of the found \
artifacts in 2-3 sentences. Focus on key findings relevant to the user's query.";

/// Per-artifact content excerpt sent to the completion service.
const CONTENT_EXCERPT_CHARS: usize = 200;

/// Summarizes artifacts through the completion service. Never fails.
#[derive(Clone)]
pub struct Summarizer {
    completion: Option<Arc<dyn ChatCompletion>>,
}

impl Summarizer {
    pub fn new(completion: Option<Arc<dyn ChatCompletion>>) -> Self {
        Self { completion }
    }

    pub fn disabled() -> Self {
        Self { completion: None }
    }

    /// 2-3 sentence summary, or `None` when the service is absent or fails.
    pub async fn summarize(&self, query: &str, artifacts: &[Artifact]) -> Option<String> {
        match self.try_summarize(query, artifacts).await {
            Outcome::Ok(summary) => Some(summary),
            Outcome::Degraded(reason) => {
                warn!(%reason, "Summary unavailable");
                None
            }
        }
    }

    async fn try_summarize(&self, query: &str, artifacts: &[Artifact]) -> Outcome<String> {
        let Some(completion) = &self.completion else {
            return Outcome::degraded(CompletionError::NotConfigured);
        };

        let request = CompletionRequest {
            system: SUMMARY_SYSTEM_PROMPT.to_string(),
            user: format!(
                "Query: {query}\n\nResults found:\n{}\n\nProvide a brief summary of these results.",
                artifact_lines(artifacts)
            ),
            temperature: 0.3,
            max_tokens: 200,
            json_response: false,
        };

        match completion.complete(request).await {
            Ok(summary) if summary.trim().is_empty() => {
                Outcome::degraded(CompletionError::EmptyResponse)
            }
            Ok(summary) => Outcome::Ok(summary.trim().to_string()),
            Err(err) => Outcome::degraded(err),
        }
    }
}

fn artifact_lines(artifacts: &[Artifact]) -> String {
    artifacts
        .iter()
        .map(|artifact| {
            format!(
                "- [{}] {}: {}...",
                artifact.source,
                artifact.title,
                truncate_chars(&artifact.content, CONTENT_EXCERPT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// First `max` characters of `text`, never splitting a code point.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
