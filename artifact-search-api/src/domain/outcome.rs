use std::fmt::Display;

/// Result of a best-effort call to an external collaborator.
///
/// `Degraded` keeps the reason for logging; callers collapse it to a plain
/// value at the component boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Degraded(String),
}

impl<T> Outcome<T> {
    pub fn degraded(reason: impl Display) -> Self {
        Outcome::Degraded(reason.to_string())
    }
}

impl<T, E: Display> From<Result<T, E>> for Outcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Ok(value),
            Err(err) => Outcome::degraded(err),
        }
    }
}
