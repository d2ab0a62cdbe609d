use async_trait::async_trait;

use crate::domain::{
    models::{AppSource, Artifact, RoutedQuery},
    ConnectorError,
};

/// Outbound port every application integration implements.
///
/// The orchestrator holds a homogeneous collection of these and never
/// branches on the concrete application.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Which application this instance represents. No I/O.
    fn source(&self) -> AppSource;

    /// Whether the required credentials are present. Must not touch the network.
    fn is_configured(&self) -> bool;

    /// Lightweight round-trip to verify credentials and reachability.
    ///
    /// Used by health reporting only, never on the search path.
    async fn test_connection(&self) -> bool;

    /// Search the application for artifacts matching the routed query.
    ///
    /// Returns an empty list when unconfigured, when nothing matches, or
    /// when the upstream rejects the request (4xx). Network failures, 5xx
    /// responses and timeouts are returned as errors for the caller to
    /// isolate.
    async fn search(&self, query: &RoutedQuery) -> Result<Vec<Artifact>, ConnectorError>;

    /// Point lookup by native ID.
    async fn get_by_id(&self, artifact_id: &str) -> Result<Option<Artifact>, ConnectorError>;

    /// Release network resources. Safe to call repeatedly, including before
    /// any resource was acquired.
    async fn close(&self);
}
