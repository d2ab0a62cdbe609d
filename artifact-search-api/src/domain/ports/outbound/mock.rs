//! Mock outbound adapters for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{ChatCompletion, CompletionRequest, Connector};
use crate::domain::{
    models::{AppSource, Artifact, RoutedQuery},
    CompletionError, ConnectorError,
};

#[derive(Debug, Clone)]
enum SearchBehavior {
    Returning(Vec<Artifact>),
    Failing(String),
    Delayed(Duration, Vec<Artifact>),
}

/// Mock connector with configurable search behavior and call tracking.
///
/// Clones share counters, so a test can keep a handle after moving the
/// connector into an orchestrator.
///
/// # Examples
///
/// ```ignore
/// let notion = MockConnector::returning(AppSource::Notion, vec![artifact]);
/// let figma = MockConnector::failing(AppSource::Figma, "boom");
/// let slow = MockConnector::delayed(AppSource::Icepanel, Duration::from_secs(5), vec![]);
/// ```
#[derive(Clone)]
pub struct MockConnector {
    source: AppSource,
    configured: bool,
    reachable: bool,
    behavior: SearchBehavior,
    search_calls: Arc<AtomicUsize>,
    close_calls: Arc<AtomicUsize>,
    last_query: Arc<Mutex<Option<RoutedQuery>>>,
}

impl MockConnector {
    fn with_behavior(source: AppSource, behavior: SearchBehavior) -> Self {
        Self {
            source,
            configured: true,
            reachable: true,
            behavior,
            search_calls: Arc::new(AtomicUsize::new(0)),
            close_calls: Arc::new(AtomicUsize::new(0)),
            last_query: Arc::new(Mutex::new(None)),
        }
    }

    /// A connector whose searches succeed with `artifacts`.
    pub fn returning(source: AppSource, artifacts: Vec<Artifact>) -> Self {
        Self::with_behavior(source, SearchBehavior::Returning(artifacts))
    }

    /// A connector whose searches fail with an upstream error.
    pub fn failing(source: AppSource, message: &str) -> Self {
        Self::with_behavior(source, SearchBehavior::Failing(message.to_string()))
    }

    /// A connector that sleeps for `delay` before every search or lookup.
    pub fn delayed(source: AppSource, delay: Duration, artifacts: Vec<Artifact>) -> Self {
        Self::with_behavior(source, SearchBehavior::Delayed(delay, artifacts))
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<RoutedQuery> {
        self.last_query.lock().unwrap().clone()
    }

    fn artifacts(&self) -> &[Artifact] {
        match &self.behavior {
            SearchBehavior::Returning(artifacts) | SearchBehavior::Delayed(_, artifacts) => {
                artifacts.as_slice()
            }
            SearchBehavior::Failing(_) => &[],
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn source(&self) -> AppSource {
        self.source
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn test_connection(&self) -> bool {
        self.configured && self.reachable
    }

    async fn search(&self, query: &RoutedQuery) -> Result<Vec<Artifact>, ConnectorError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());

        match &self.behavior {
            SearchBehavior::Returning(artifacts) => Ok(artifacts.clone()),
            SearchBehavior::Failing(message) => Err(ConnectorError::Upstream {
                status: 500,
                message: message.clone(),
            }),
            SearchBehavior::Delayed(delay, artifacts) => {
                tokio::time::sleep(*delay).await;
                Ok(artifacts.clone())
            }
        }
    }

    async fn get_by_id(&self, artifact_id: &str) -> Result<Option<Artifact>, ConnectorError> {
        match &self.behavior {
            SearchBehavior::Failing(message) => {
                return Err(ConnectorError::Request(message.clone()))
            }
            SearchBehavior::Delayed(delay, _) => tokio::time::sleep(*delay).await,
            SearchBehavior::Returning(_) => {}
        }
        Ok(self
            .artifacts()
            .iter()
            .find(|artifact| artifact.id == artifact_id)
            .cloned())
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock completion service returning a fixed response or failing.
#[derive(Clone)]
pub struct MockCompletion {
    response: Result<String, String>,
    call_count: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<CompletionRequest>>>,
}

impl MockCompletion {
    pub fn returning(response: impl Into<String>) -> Self {
        Self {
            response: Ok(response.into()),
            call_count: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
            call_count: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatCompletion for MockCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);

        self.response.clone().map_err(CompletionError::Request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ArtifactType;

    fn routed() -> RoutedQuery {
        RoutedQuery {
            original_query: "q".to_string(),
            target_apps: vec![AppSource::Notion],
            artifact_types: vec![ArtifactType::Document],
            search_terms: vec!["q".to_string()],
        }
    }

    #[tokio::test]
    async fn mock_connector_tracks_calls_across_clones() {
        let connector = MockConnector::returning(AppSource::Notion, vec![]);
        let handle = connector.clone();

        connector.search(&routed()).await.unwrap();
        connector.close().await;

        assert_eq!(handle.search_calls(), 1);
        assert_eq!(handle.close_calls(), 1);
        assert_eq!(handle.last_query(), Some(routed()));
    }

    #[tokio::test]
    async fn mock_connector_failing_returns_error() {
        let connector = MockConnector::failing(AppSource::Figma, "boom");
        assert!(connector.search(&routed()).await.is_err());
    }

    #[tokio::test]
    async fn mock_completion_records_request() {
        let completion = MockCompletion::returning("ok");
        let request = CompletionRequest {
            system: "s".to_string(),
            user: "u".to_string(),
            temperature: 0.0,
            max_tokens: 1,
            json_response: false,
        };

        assert_eq!(completion.complete(request.clone()).await.unwrap(), "ok");
        assert_eq!(completion.call_count(), 1);
        assert_eq!(completion.last_request(), Some(request));
    }
}
