//! Composition root: the only place that names concrete outbound adapters.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    adapters::outbound::{
        AzureDevOpsConnector, AzureOpenAiClient, FigmaConnector, IcePanelConnector,
        NotionConnector,
    },
    config::Settings,
    domain::{
        ports::outbound::{ChatCompletion, Connector},
        OrchestratorConfig, QueryRouter, SearchOrchestrator, Summarizer,
    },
};

/// One connector per known application, configured or not.
pub fn connectors(settings: &Settings) -> Vec<Arc<dyn Connector>> {
    vec![
        Arc::new(AzureDevOpsConnector::new(settings.azure_devops.clone())),
        Arc::new(FigmaConnector::new(settings.figma.clone())),
        Arc::new(NotionConnector::new(settings.notion.clone())),
        Arc::new(IcePanelConnector::new(settings.icepanel.clone())),
    ]
}

/// The completion client, or `None` when Azure AI is not configured.
pub fn completion(settings: &Settings) -> Option<Arc<dyn ChatCompletion>> {
    if !settings.is_azure_ai_configured() {
        info!("Azure AI not configured, keyword routing only and no summaries");
        return None;
    }

    match AzureOpenAiClient::new(&settings.azure_ai) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!(error = %e, "Failed to create Azure AI client, keyword routing only");
            None
        }
    }
}

pub fn orchestrator(settings: &Settings) -> SearchOrchestrator {
    info!(
        azure_devops = settings.is_azure_devops_configured(),
        figma = settings.is_figma_configured(),
        notion = settings.is_notion_configured(),
        icepanel = settings.is_icepanel_configured(),
        "Source configuration"
    );

    let (router, summarizer) = match completion(settings) {
        Some(completion) => (
            QueryRouter::new(Some(completion.clone())),
            Summarizer::new(Some(completion)),
        ),
        None => (QueryRouter::fallback_only(), Summarizer::disabled()),
    };

    SearchOrchestrator::new(
        connectors(settings),
        router,
        summarizer,
        OrchestratorConfig {
            connector_timeout: settings.search.connector_timeout(),
            summary_artifact_limit: settings.search.summary_artifact_limit,
        },
    )
}
