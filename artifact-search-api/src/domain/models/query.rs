use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{AppSource, ArtifactType};

/// Incoming natural-language query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: Map::new(),
        }
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }
}

impl From<&str> for SearchQuery {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for SearchQuery {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Structured intent produced by the query router.
///
/// `target_apps` and `artifact_types` may contain duplicates; consumers
/// treat them as sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedQuery {
    pub original_query: String,
    pub target_apps: Vec<AppSource>,
    pub artifact_types: Vec<ArtifactType>,
    pub search_terms: Vec<String>,
}

impl RoutedQuery {
    /// Search terms lower-cased, for case-insensitive substring matching.
    pub fn lowercase_terms(&self) -> Vec<String> {
        self.search_terms
            .iter()
            .map(|term| term.to_lowercase())
            .collect()
    }
}
