//! Fan-out/fan-in search across the configured connectors.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::{
    models::{AppSource, Artifact, RoutedQuery, SearchQuery, SearchResult},
    ports::outbound::Connector,
    ConnectorError, QueryRouter, Summarizer,
};

/// Tunables for [`SearchOrchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound for a single connector search
    pub connector_timeout: Duration,
    /// Number of top-ranked artifacts passed to the summarizer
    pub summary_artifact_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            connector_timeout: Duration::from_secs(30),
            summary_artifact_limit: 10,
        }
    }
}

/// Reachability of each known application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionReport {
    pub configured_sources: Vec<AppSource>,
    pub connections: BTreeMap<AppSource, bool>,
}

impl ConnectionReport {
    /// True when every configured source passed its connection check.
    pub fn all_configured_reachable(&self) -> bool {
        self.configured_sources
            .iter()
            .all(|source| self.connections.get(source).copied().unwrap_or(false))
    }
}

/// Routes a query, searches the matching connectors concurrently, and
/// merges the results newest first.
///
/// The connector map is fixed at construction. Connectors whose
/// credentials are missing are dropped and never consulted again.
///
/// # Examples
///
/// ```ignore
/// let orchestrator = SearchOrchestrator::new(
///     connectors,
///     QueryRouter::new(completion.clone()),
///     Summarizer::new(completion),
///     OrchestratorConfig::default(),
/// );
/// let result = orchestrator.search("What are the risks related to alerts?").await;
/// ```
pub struct SearchOrchestrator {
    connectors: BTreeMap<AppSource, Arc<dyn Connector>>,
    router: QueryRouter,
    summarizer: Summarizer,
    config: OrchestratorConfig,
}

impl SearchOrchestrator {
    pub fn new(
        connectors: Vec<Arc<dyn Connector>>,
        router: QueryRouter,
        summarizer: Summarizer,
        config: OrchestratorConfig,
    ) -> Self {
        let mut live = BTreeMap::new();
        for connector in connectors {
            let source = connector.source();
            if connector.is_configured() {
                info!(%source, "Connector configured");
                live.insert(source, connector);
            } else {
                debug!(%source, "Connector not configured, skipping");
            }
        }

        Self {
            connectors: live,
            router,
            summarizer,
            config,
        }
    }

    /// Sources with a live connector, in canonical order.
    pub fn configured_sources(&self) -> Vec<AppSource> {
        self.connectors.keys().copied().collect()
    }

    /// Run one search. Never fails; worst case is an empty result.
    pub async fn search(&self, query: impl Into<SearchQuery>) -> SearchResult {
        self.search_query(query.into()).await
    }

    #[instrument(name = "search", skip(self, query), fields(query = %query.text))]
    async fn search_query(&self, query: SearchQuery) -> SearchResult {
        let started = Instant::now();

        let routed = self.router.route(&query).await;

        let targets = routed
            .target_apps
            .iter()
            .copied()
            .unique()
            .filter_map(|source| match self.connectors.get(&source) {
                Some(connector) => Some((source, Arc::clone(connector))),
                None => {
                    debug!(%source, "Routed source not configured");
                    None
                }
            })
            .collect::<Vec<_>>();

        if targets.is_empty() {
            info!("No configured connector matches the routed query");
            return SearchResult::empty(query.text, elapsed_ms(started));
        }

        let outcomes = join_all(
            targets
                .iter()
                .map(|(source, connector)| self.search_connector(*source, connector, &routed)),
        )
        .await;

        let mut artifacts = Vec::new();
        let mut sources_searched = Vec::new();
        for ((source, _), outcome) in targets.iter().zip(outcomes) {
            match outcome {
                Ok(found) => {
                    debug!(%source, count = found.len(), "Connector search completed");
                    sources_searched.push(*source);
                    artifacts.extend(found);
                }
                Err(err) => warn!(%source, error = %err, "Connector search failed"),
            }
        }

        rank_by_recency(&mut artifacts);
        let total_results = artifacts.len();

        let summary = if artifacts.is_empty() {
            None
        } else {
            let top = &artifacts[..artifacts.len().min(self.config.summary_artifact_limit)];
            self.summarizer.summarize(&query.text, top).await
        };

        let search_duration_ms = elapsed_ms(started);
        info!(
            total_results,
            sources = ?sources_searched,
            duration_ms = search_duration_ms,
            "Search completed"
        );

        SearchResult {
            query: query.text,
            artifacts,
            sources_searched,
            total_results,
            search_duration_ms,
            summary,
        }
    }

    async fn search_connector(
        &self,
        source: AppSource,
        connector: &Arc<dyn Connector>,
        routed: &RoutedQuery,
    ) -> Result<Vec<Artifact>, ConnectorError> {
        let timeout = self.config.connector_timeout;
        match tokio::time::timeout(timeout, connector.search(routed)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(%source, ?timeout, "Connector search timed out");
                Err(ConnectorError::Timeout(timeout))
            }
        }
    }

    /// Direct lookup on a single source, bounded by the connector timeout.
    ///
    /// `Ok(None)` when the source is not configured or the artifact does not exist.
    #[instrument(skip(self))]
    pub async fn get_artifact(
        &self,
        source: AppSource,
        artifact_id: &str,
    ) -> Result<Option<Artifact>, ConnectorError> {
        let Some(connector) = self.connectors.get(&source) else {
            return Ok(None);
        };

        let timeout = self.config.connector_timeout;
        match tokio::time::timeout(timeout, connector.get_by_id(artifact_id)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%source, ?timeout, "Artifact lookup timed out");
                Err(ConnectorError::Timeout(timeout))
            }
        }
    }

    /// Check every configured connector concurrently. Unconfigured sources report `false`.
    pub async fn connection_report(&self) -> ConnectionReport {
        let checks = join_all(self.connectors.iter().map(|(source, connector)| async move {
            (*source, connector.test_connection().await)
        }))
        .await
        .into_iter()
        .collect::<BTreeMap<_, _>>();

        let connections = AppSource::all()
            .into_iter()
            .map(|source| (source, checks.get(&source).copied().unwrap_or(false)))
            .collect();

        ConnectionReport {
            configured_sources: self.configured_sources(),
            connections,
        }
    }

    /// Release every connector's network resources.
    pub async fn close(&self) {
        join_all(self.connectors.values().map(|connector| connector.close())).await;
        info!("Search orchestrator closed");
    }
}

/// Newest first by effective timestamp; missing timestamps last. Stable.
fn rank_by_recency(artifacts: &mut [Artifact]) {
    artifacts.sort_by(|a, b| b.effective_timestamp().cmp(&a.effective_timestamp()));
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
