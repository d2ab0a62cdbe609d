mod error;
pub mod models;
mod orchestrator;
mod outcome;
pub mod ports;
mod router;
mod summarizer;

pub use error::{CompletionError, ConnectorError};
pub use orchestrator::{OrchestratorConfig, SearchOrchestrator};
pub use outcome::Outcome;
pub use router::QueryRouter;
pub use summarizer::Summarizer;
