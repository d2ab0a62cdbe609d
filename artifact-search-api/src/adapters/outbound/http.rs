//! Shared HTTP plumbing for the application connectors.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::{header::HeaderMap, Response, StatusCode};
use tokio::sync::Mutex;

use crate::domain::{models::AppSource, ConnectorError};

/// Per-request timeout for every connector client.
pub(crate) const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of artifacts a connector returns per search.
pub(crate) const MAX_RESULTS: usize = 20;

/// A network client created on first use and dropped on `close`.
///
/// Creation happens while holding the lock, so concurrent first callers
/// share a single client.
pub(crate) struct LazyClient<C> {
    client: Mutex<Option<C>>,
    created: AtomicUsize,
}

impl<C: Clone> LazyClient<C> {
    pub(crate) fn new() -> Self {
        Self {
            client: Mutex::new(None),
            created: AtomicUsize::new(0),
        }
    }

    /// Return the live client, creating it with `init` if there is none.
    pub(crate) async fn get_or_try_init<E>(
        &self,
        init: impl FnOnce() -> Result<C, E>,
    ) -> Result<C, E> {
        let mut guard = self.client.lock().await;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let client = init()?;
        self.created.fetch_add(1, Ordering::SeqCst);
        *guard = Some(client.clone());
        Ok(client)
    }

    /// Drop the client. Returns whether one was live.
    pub(crate) async fn close(&self) -> bool {
        self.client.lock().await.take().is_some()
    }

    /// How many clients have been created over this instance's lifetime.
    #[cfg(test)]
    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

/// Build a `reqwest` client with the connector timeout and default headers.
pub(crate) fn build_client(headers: HeaderMap) -> Result<reqwest::Client, ConnectorError> {
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(CLIENT_TIMEOUT)
        .build()
        .map_err(|e| ConnectorError::Setup(e.to_string()))
}

/// Classify an upstream response.
///
/// 2xx passes through. 4xx is logged and becomes `None` (treated as no
/// results). Anything else is an error.
pub(crate) async fn accept(
    source: AppSource,
    response: Response,
) -> Result<Option<Response>, ConnectorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(Some(response));
    }

    let body = response.text().await.unwrap_or_default();
    match classify_status(status) {
        StatusClass::Rejected => {
            tracing::warn!(%source, status = status.as_u16(), body = %body, "Request rejected by upstream");
            Ok(None)
        }
        StatusClass::Failed | StatusClass::Success => Err(ConnectorError::Upstream {
            status: status.as_u16(),
            message: body,
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusClass {
    Success,
    Rejected,
    Failed,
}

pub(crate) fn classify_status(status: StatusCode) -> StatusClass {
    if status.is_success() {
        StatusClass::Success
    } else if status.is_client_error() {
        StatusClass::Rejected
    } else {
        StatusClass::Failed
    }
}
