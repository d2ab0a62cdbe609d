use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// External application that owns an artifact or is a routing target.
///
/// Adding a variant requires a matching connector in `crate::factory`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AppSource {
    AzureDevops,
    Figma,
    Notion,
    Icepanel,
}

impl AppSource {
    pub fn all() -> Vec<AppSource> {
        AppSource::iter().collect()
    }
}

/// Domain classification of an artifact.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactType {
    Requirement,
    Risk,
    Mitigation,
    Design,
    Architecture,
    WorkItem,
    TestCase,
    Document,
}
