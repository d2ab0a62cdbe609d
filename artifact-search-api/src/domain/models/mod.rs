mod app_source;
mod artifact;
mod query;

pub use app_source::*;
pub use artifact::*;
pub use query::*;
