mod azure_devops;
mod azure_openai;
mod figma;
mod http;
mod icepanel;
mod notion;

pub use azure_devops::AzureDevOpsConnector;
pub use azure_openai::AzureOpenAiClient;
pub use figma::FigmaConnector;
pub use icepanel::IcePanelConnector;
pub use notion::NotionConnector;
