use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde_with::serde_as;
use strum::{Display, EnumString};
use thiserror::Error;

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub azure_devops: AzureDevOpsSettings,
    pub figma: FigmaSettings,
    pub notion: NotionSettings,
    pub icepanel: IcePanelSettings,
    pub azure_ai: AzureAiSettings,
    pub search: SearchSettings,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Comma-separated list of origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl ApplicationSettings {
    pub fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct AzureDevOpsSettings {
    #[serde(default)]
    pub org_url: Option<String>,
    #[serde(default)]
    pub pat: Option<String>,
    #[serde(default = "default_project")]
    pub project: String,
}

impl Default for AzureDevOpsSettings {
    fn default() -> Self {
        Self {
            org_url: None,
            pat: None,
            project: default_project(),
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct FigmaSettings {
    pub access_token: Option<String>,
    pub file_key: Option<String>,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct NotionSettings {
    pub api_key: Option<String>,
    pub database_id: Option<String>,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct IcePanelSettings {
    pub api_key: Option<String>,
    pub landscape_id: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AzureAiSettings {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_deployment")]
    pub deployment: String,
    /// Use an Azure CLI token when no API key is set
    #[serde(default = "default_true")]
    pub use_ad_auth: bool,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for AzureAiSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            deployment: default_deployment(),
            use_ad_auth: true,
            api_version: default_api_version(),
        }
    }
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct SearchSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    #[serde(default = "default_connector_timeout_secs")]
    pub connector_timeout_secs: u64,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    #[serde(default = "default_summary_artifact_limit")]
    pub summary_artifact_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            connector_timeout_secs: default_connector_timeout_secs(),
            summary_artifact_limit: default_summary_artifact_limit(),
        }
    }
}

impl SearchSettings {
    pub fn connector_timeout(&self) -> Duration {
        Duration::from_secs(self.connector_timeout_secs)
    }
}

fn default_port() -> u16 {
    8000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_allowed_origins() -> String {
    "http://localhost:3000,http://localhost:5173".to_string()
}

fn default_project() -> String {
    "RiskManagement".to_string()
}

fn default_deployment() -> String {
    "gpt-4o".to_string()
}

fn default_api_version() -> String {
    "2024-02-01".to_string()
}

fn default_true() -> bool {
    true
}

fn default_connector_timeout_secs() -> u64 {
    30
}

fn default_summary_artifact_limit() -> usize {
    10
}

/// A credential counts as present only when it is non-blank.
fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|value| !value.trim().is_empty())
}

/// Both values trimmed, or `None` if either is missing or blank.
fn credential_pair<'a>(
    first: &'a Option<String>,
    second: &'a Option<String>,
) -> Option<(&'a str, &'a str)> {
    let first = first.as_deref().map(str::trim)?;
    let second = second.as_deref().map(str::trim)?;
    (!first.is_empty() && !second.is_empty()).then_some((first, second))
}

impl AzureDevOpsSettings {
    /// `(org_url, pat)` when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        credential_pair(&self.org_url, &self.pat)
    }
}

impl FigmaSettings {
    /// `(access_token, file_key)` when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        credential_pair(&self.access_token, &self.file_key)
    }
}

impl NotionSettings {
    /// `(api_key, database_id)` when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        credential_pair(&self.api_key, &self.database_id)
    }
}

impl IcePanelSettings {
    /// `(api_key, landscape_id)` when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        credential_pair(&self.api_key, &self.landscape_id)
    }
}

impl Settings {
    pub fn is_azure_devops_configured(&self) -> bool {
        self.azure_devops.credentials().is_some()
    }

    pub fn is_figma_configured(&self) -> bool {
        self.figma.credentials().is_some()
    }

    pub fn is_notion_configured(&self) -> bool {
        self.notion.credentials().is_some()
    }

    pub fn is_icepanel_configured(&self) -> bool {
        self.icepanel.credentials().is_some()
    }

    pub fn is_azure_ai_configured(&self) -> bool {
        present(&self.azure_ai.endpoint)
            && (present(&self.azure_ai.api_key) || self.azure_ai.use_ad_auth)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("Failed to determine the current directory: {0}")]
    CurrentDir(#[from] std::io::Error),
    #[error("Invalid APP_ENVIRONMENT `{0}`, expected `local` or `production`")]
    InvalidEnvironment(String),
}

pub fn read_config() -> Result<Settings, ConfigError> {
    let base_path = std::env::current_dir()?;
    let config_directory = base_path.join("config");

    let environment_name = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "local".into());
    let environment = Environment::from_str(&environment_name)
        .map_err(|_| ConfigError::InvalidEnvironment(environment_name.clone()))?;
    let environment_filename = format!("{}.yaml", environment);

    let settings = config::Config::builder()
        .add_source(config::File::from(config_directory.join("base.yaml")).required(false))
        .add_source(
            config::File::from(config_directory.join(environment_filename)).required(false),
        )
        .add_source(
            config::Environment::with_prefix("ARTIFACT_SEARCH")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize::<Settings>()?)
}

#[derive(Display, Debug, EnumString, PartialEq)]
pub enum Environment {
    #[strum(ascii_case_insensitive, serialize = "local")]
    Local,
    #[strum(ascii_case_insensitive, serialize = "production")]
    Production,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_from_yaml(yaml: &str) -> Settings {
        config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn empty_config_is_fully_unconfigured() {
        let settings = settings_from_yaml("{}");

        assert_eq!(settings.application.port, 8000);
        assert_eq!(settings.application.host, "0.0.0.0");
        assert_eq!(settings.azure_devops.project, "RiskManagement");
        assert_eq!(settings.azure_ai.deployment, "gpt-4o");
        assert!(settings.azure_ai.use_ad_auth);
        assert_eq!(settings.search.connector_timeout(), Duration::from_secs(30));
        assert_eq!(settings.search.summary_artifact_limit, 10);

        assert!(!settings.is_azure_devops_configured());
        assert!(!settings.is_figma_configured());
        assert!(!settings.is_notion_configured());
        assert!(!settings.is_icepanel_configured());
        assert!(!settings.is_azure_ai_configured());
    }

    #[test]
    fn predicates_require_every_credential() {
        let settings = settings_from_yaml(
            r#"
azure_devops:
  org_url: https://dev.azure.com/contoso
  pat: secret
figma:
  access_token: token
notion:
  api_key: key
  database_id: "   "
icepanel:
  api_key: key
  landscape_id: landscape
"#,
        );

        assert!(settings.is_azure_devops_configured());
        assert!(!settings.is_figma_configured());
        assert!(!settings.is_notion_configured());
        assert!(settings.is_icepanel_configured());
    }

    #[test]
    fn section_credentials_are_trimmed() {
        let settings = settings_from_yaml(
            r#"
figma:
  access_token: " token "
  file_key: "file\n"
notion:
  api_key: key
"#,
        );

        assert_eq!(settings.figma.credentials(), Some(("token", "file")));
        assert_eq!(settings.notion.credentials(), None);
    }

    #[test]
    fn azure_ai_accepts_key_or_ad_auth() {
        let mut settings = Settings::default();
        settings.azure_ai.endpoint = Some("https://contoso.openai.azure.com".into());
        assert!(settings.is_azure_ai_configured());

        settings.azure_ai.use_ad_auth = false;
        assert!(!settings.is_azure_ai_configured());

        settings.azure_ai.api_key = Some("key".into());
        assert!(settings.is_azure_ai_configured());
    }

    #[test]
    fn allowed_origins_are_split_and_trimmed() {
        let application = ApplicationSettings {
            allowed_origins: "http://a.test, http://b.test,,".into(),
            ..ApplicationSettings::default()
        };
        assert_eq!(
            application.allowed_origins(),
            vec!["http://a.test", "http://b.test"]
        );
    }

    #[test]
    fn environment_parses_case_insensitively() {
        assert_eq!(Environment::from_str("PRODUCTION").unwrap(), Environment::Production);
        assert!(Environment::from_str("staging").is_err());
    }
}
