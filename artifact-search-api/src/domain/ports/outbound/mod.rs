mod completion;
mod connector;
#[cfg(test)]
mod mock;

pub use completion::*;
pub use connector::*;
#[cfg(test)]
pub use mock::{MockCompletion, MockConnector};
