pub(crate) mod artifacts;
pub(crate) mod chat;
mod error;
pub(crate) mod health;
pub(crate) mod search;
pub(crate) mod sources;

pub(crate) use error::ApiError;
