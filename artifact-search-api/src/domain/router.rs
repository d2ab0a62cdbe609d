//! Query routing: natural-language query → target applications, artifact
//! types and search terms.
//!
//! The primary path asks the completion service for a JSON classification.
//! Any failure there (transport, empty response, malformed JSON, unknown
//! enum value) degrades to [`route_fallback`], a pure keyword matcher, so
//! [`QueryRouter::route`] always produces a [`RoutedQuery`].

use std::sync::Arc;

use itertools::Itertools;
use serde::Deserialize;
use strum::IntoEnumIterator;
use tracing::{debug, warn};

use super::{
    models::{AppSource, ArtifactType, RoutedQuery, SearchQuery},
    outcome::Outcome,
    ports::outbound::{ChatCompletion, CompletionRequest},
};

const ROUTING_SYSTEM_PROMPT: &str = r#"You are a query router for a MedTech risk management artifact search system.

Your job is to analyze user queries and determine:
1. Which application(s) should be searched
2. What type of artifacts to look for
3. Key search terms to use

Available applications and their purposes:
- azure_devops: Work items, tasks, bugs, user stories, requirements tracking, test cases, sprints
- figma: UI/UX designs, wireframes, mockups, design components, visual specifications
- notion: Documentation, knowledge base, meeting notes, policies, procedures, SOPs
- icepanel: Architecture diagrams, C4 models, system components, technical architecture

Artifact types:
- requirement: Product/system requirements, user stories, features
- risk: Risk items, hazards, potential harms (ISO 14971)
- mitigation: Risk controls, mitigations, protective measures
- design: UI designs, wireframes, visual specifications
- architecture: System architecture, C4 diagrams, technical components
- work_item: Tasks, bugs, sprints, general work items
- test_case: Test cases, verification, validation
- document: General documentation, SOPs, policies

For MedTech risk management queries:
- Requirements related to risks -> search azure_devops, notion
- Risk items and hazards -> search azure_devops, notion
- Mitigations and controls -> search azure_devops, notion
- Design specifications -> search figma
- Architecture questions -> search icepanel
- Documentation/SOPs -> search notion
- General work tracking -> search azure_devops

Respond with JSON only, no explanation:
{
  "target_apps": ["app1", "app2"],
  "artifact_types": ["type1", "type2"],
  "search_terms": ["term1", "term2", "term3"]
}
"#;

/// Keyword rule: any keyword found in the lower-cased query adds the apps and type.
struct KeywordRule {
    keywords: &'static [&'static str],
    apps: &'static [AppSource],
    artifact_type: ArtifactType,
}

const FALLBACK_RULES: &[KeywordRule] = &[
    KeywordRule {
        keywords: &["design", "ui", "ux", "wireframe", "mockup"],
        apps: &[AppSource::Figma],
        artifact_type: ArtifactType::Design,
    },
    KeywordRule {
        keywords: &["architecture", "system", "component", "c4", "diagram"],
        apps: &[AppSource::Icepanel],
        artifact_type: ArtifactType::Architecture,
    },
    KeywordRule {
        keywords: &["risk", "hazard", "harm", "severity"],
        apps: &[AppSource::AzureDevops, AppSource::Notion],
        artifact_type: ArtifactType::Risk,
    },
    KeywordRule {
        keywords: &["mitigation", "control", "measure", "protection"],
        apps: &[AppSource::AzureDevops, AppSource::Notion],
        artifact_type: ArtifactType::Mitigation,
    },
    KeywordRule {
        keywords: &["requirement", "req", "story", "feature"],
        apps: &[AppSource::AzureDevops, AppSource::Notion],
        artifact_type: ArtifactType::Requirement,
    },
    KeywordRule {
        keywords: &["document", "sop", "procedure", "policy"],
        apps: &[AppSource::Notion],
        artifact_type: ArtifactType::Document,
    },
    KeywordRule {
        keywords: &["task", "bug", "sprint", "work item"],
        apps: &[AppSource::AzureDevops],
        artifact_type: ArtifactType::WorkItem,
    },
];

/// Number of query tokens used when the classifier omits search terms.
const DEFAULT_TERM_COUNT: usize = 5;

/// Shape the classifier is asked to return.
#[derive(Debug, Deserialize)]
struct Classification {
    #[serde(default)]
    target_apps: Vec<AppSource>,
    #[serde(default)]
    artifact_types: Vec<ArtifactType>,
    #[serde(default)]
    search_terms: Vec<String>,
}

/// Routes queries through the completion service with a keyword fallback.
#[derive(Clone)]
pub struct QueryRouter {
    completion: Option<Arc<dyn ChatCompletion>>,
}

impl QueryRouter {
    pub fn new(completion: Option<Arc<dyn ChatCompletion>>) -> Self {
        Self { completion }
    }

    /// Router that only ever uses keyword routing.
    pub fn fallback_only() -> Self {
        Self { completion: None }
    }

    /// Route a query. Never fails.
    pub async fn route(&self, query: &SearchQuery) -> RoutedQuery {
        match self.classify(query).await {
            Outcome::Ok(routed) => {
                debug!(
                    target_apps = ?routed.target_apps,
                    artifact_types = ?routed.artifact_types,
                    "Classifier routed query"
                );
                routed
            }
            Outcome::Degraded(reason) => {
                warn!(%reason, "Classifier unavailable, using fallback routing");
                route_fallback(query)
            }
        }
    }

    async fn classify(&self, query: &SearchQuery) -> Outcome<RoutedQuery> {
        let Some(completion) = &self.completion else {
            return Outcome::degraded("completion service not configured");
        };

        let request = CompletionRequest {
            system: ROUTING_SYSTEM_PROMPT.to_string(),
            user: query.text.clone(),
            temperature: 0.1,
            max_tokens: 500,
            json_response: true,
        };

        let content = match completion.complete(request).await {
            Ok(content) => content,
            Err(err) => return Outcome::degraded(err),
        };

        parse_classification(query, &content).into()
    }
}

/// Parse the classifier's JSON into a routed query, filling empty lists with defaults.
fn parse_classification(
    query: &SearchQuery,
    content: &str,
) -> Result<RoutedQuery, serde_json::Error> {
    let classification: Classification = serde_json::from_str(content.trim())?;

    let target_apps = if classification.target_apps.is_empty() {
        vec![AppSource::AzureDevops, AppSource::Notion]
    } else {
        classification.target_apps
    };

    let artifact_types = if classification.artifact_types.is_empty() {
        vec![ArtifactType::Document]
    } else {
        classification.artifact_types
    };

    let search_terms = classification
        .search_terms
        .into_iter()
        .filter(|term| !term.trim().is_empty())
        .collect::<Vec<_>>();
    let search_terms = if search_terms.is_empty() {
        query
            .text
            .split_whitespace()
            .take(DEFAULT_TERM_COUNT)
            .map(str::to_owned)
            .collect()
    } else {
        search_terms
    };

    Ok(RoutedQuery {
        original_query: query.text.clone(),
        target_apps,
        artifact_types,
        search_terms: non_empty_terms(search_terms, &query.text),
    })
}

/// Deterministic keyword routing used when the classifier is unavailable.
///
/// Rules are evaluated independently and their results unioned. With no
/// match every known application is targeted. Search terms are the raw
/// whitespace tokens of the query.
pub fn route_fallback(query: &SearchQuery) -> RoutedQuery {
    let lowered = query.text.to_lowercase();

    let matched = FALLBACK_RULES
        .iter()
        .filter(|rule| rule.keywords.iter().any(|keyword| lowered.contains(keyword)))
        .collect::<Vec<_>>();

    let target_apps = if matched.is_empty() {
        AppSource::iter().collect()
    } else {
        matched
            .iter()
            .flat_map(|rule| rule.apps.iter().copied())
            .unique()
            .collect()
    };

    let artifact_types = if matched.is_empty() {
        vec![ArtifactType::Document, ArtifactType::Requirement]
    } else {
        matched
            .iter()
            .map(|rule| rule.artifact_type)
            .unique()
            .collect()
    };

    let tokens = query
        .text
        .split_whitespace()
        .map(str::to_owned)
        .collect::<Vec<_>>();

    RoutedQuery {
        original_query: query.text.clone(),
        target_apps,
        artifact_types,
        search_terms: non_empty_terms(tokens, &query.text),
    }
}

/// Guarantee at least one search term by falling back to the whole query.
fn non_empty_terms(terms: Vec<String>, query: &str) -> Vec<String> {
    if terms.is_empty() {
        vec![query.trim().to_string()]
    } else {
        terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::outbound::MockCompletion;

    fn fallback(text: &str) -> RoutedQuery {
        route_fallback(&SearchQuery::from(text))
    }

    #[test]
    fn fallback_is_total() {
        for text in ["", "   ", "?!.,;", "zxqv wlmp", "ünïcödé ☃"] {
            let routed = fallback(text);
            assert!(!routed.target_apps.is_empty(), "no apps for {text:?}");
            assert!(!routed.artifact_types.is_empty(), "no types for {text:?}");
            assert!(!routed.search_terms.is_empty(), "no terms for {text:?}");
        }
    }

    #[test]
    fn fallback_without_match_targets_all_apps() {
        let routed = fallback("zxqv wlmp");
        assert_eq!(routed.target_apps, AppSource::all());
        assert_eq!(
            routed.artifact_types,
            vec![ArtifactType::Document, ArtifactType::Requirement]
        );
    }

    #[test]
    fn fallback_rules_are_additive() {
        let routed = fallback("risk and design review");

        assert!(routed.target_apps.contains(&AppSource::Figma));
        assert!(routed.target_apps.contains(&AppSource::AzureDevops));
        assert!(routed.target_apps.contains(&AppSource::Notion));
        assert!(routed.artifact_types.contains(&ArtifactType::Design));
        assert!(routed.artifact_types.contains(&ArtifactType::Risk));
    }

    #[test]
    fn fallback_deduplicates_apps() {
        let routed = fallback("hazard mitigation story");

        assert_eq!(
            routed.target_apps,
            vec![AppSource::AzureDevops, AppSource::Notion]
        );
        assert_eq!(
            routed.artifact_types,
            vec![
                ArtifactType::Risk,
                ArtifactType::Mitigation,
                ArtifactType::Requirement
            ]
        );
    }

    #[test]
    fn fallback_routes_risk_question() {
        let routed = fallback("What are the risks related to alerts?");

        assert_eq!(
            routed.target_apps,
            vec![AppSource::AzureDevops, AppSource::Notion]
        );
        assert_eq!(routed.artifact_types, vec![ArtifactType::Risk]);
    }

    #[test]
    fn fallback_terms_are_raw_whitespace_tokens() {
        let routed = fallback("What are the risks related to alerts?");
        assert_eq!(
            routed.search_terms,
            vec!["What", "are", "the", "risks", "related", "to", "alerts?"]
        );
        assert_eq!(routed.original_query, "What are the risks related to alerts?");
    }

    #[test]
    fn fallback_matches_case_insensitively() {
        let routed = fallback("C4 ARCHITECTURE overview");
        assert_eq!(routed.target_apps, vec![AppSource::Icepanel]);
        assert_eq!(routed.artifact_types, vec![ArtifactType::Architecture]);
    }

    #[tokio::test]
    async fn router_without_completion_uses_fallback() {
        let router = QueryRouter::fallback_only();
        let query = SearchQuery::from("wireframe for alarm screen");

        assert_eq!(router.route(&query).await, route_fallback(&query));
    }

    #[tokio::test]
    async fn router_uses_classifier_response() {
        let completion = MockCompletion::returning(
            r#"{"target_apps": ["icepanel"], "artifact_types": ["architecture"], "search_terms": ["alarm", "gateway"]}"#,
        );
        let router = QueryRouter::new(Some(Arc::new(completion.clone())));

        let routed = router.route(&SearchQuery::from("how do alarms flow?")).await;

        assert_eq!(routed.target_apps, vec![AppSource::Icepanel]);
        assert_eq!(routed.artifact_types, vec![ArtifactType::Architecture]);
        assert_eq!(routed.search_terms, vec!["alarm", "gateway"]);

        let request = completion.last_request().unwrap();
        assert!(request.json_response);
        assert_eq!(request.user, "how do alarms flow?");
        assert!(request.system.contains("icepanel"));
    }

    #[tokio::test]
    async fn router_fills_empty_classifier_lists() {
        let completion = MockCompletion::returning(
            r#"{"target_apps": [], "artifact_types": [], "search_terms": []}"#,
        );
        let router = QueryRouter::new(Some(Arc::new(completion)));

        let routed = router
            .route(&SearchQuery::from("one two three four five six seven"))
            .await;

        assert_eq!(
            routed.target_apps,
            vec![AppSource::AzureDevops, AppSource::Notion]
        );
        assert_eq!(routed.artifact_types, vec![ArtifactType::Document]);
        assert_eq!(routed.search_terms, vec!["one", "two", "three", "four", "five"]);
    }

    #[tokio::test]
    async fn router_falls_back_on_unknown_app() {
        let completion = MockCompletion::returning(
            r#"{"target_apps": ["jira"], "artifact_types": ["risk"], "search_terms": ["x"]}"#,
        );
        let router = QueryRouter::new(Some(Arc::new(completion)));
        let query = SearchQuery::from("hazard list");

        assert_eq!(router.route(&query).await, route_fallback(&query));
    }

    #[tokio::test]
    async fn router_falls_back_on_malformed_json() {
        let completion = MockCompletion::returning("Sure! Here is the routing: azure_devops");
        let router = QueryRouter::new(Some(Arc::new(completion)));
        let query = SearchQuery::from("hazard list");

        assert_eq!(router.route(&query).await, route_fallback(&query));
    }

    #[tokio::test]
    async fn router_falls_back_on_service_error() {
        let completion = MockCompletion::failing("connection refused");
        let router = QueryRouter::new(Some(Arc::new(completion.clone())));
        let query = SearchQuery::from("sprint bugs");

        assert_eq!(router.route(&query).await, route_fallback(&query));
        assert_eq!(completion.call_count(), 1);
    }
}
