//! Remote recap trigger.
//!
//! A single bounded-timeout `POST` per request, never retried. The outcome is
//! a typed [`RecapOutcome`]; choosing what to tell the user is the
//! dispatcher's job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::RecapConfig;

/// Result of one recap trigger attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecapOutcome {
    /// The remote answered HTTP 200.
    Success,
    /// The remote answered with any other status.
    RemoteFailure(u16),
    /// The request never completed (connect error, timeout, ...).
    TransportError(String),
}

impl RecapOutcome {
    /// Whether the recap was accepted.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Classify a response status. Only `200 OK` counts as success.
pub fn classify_status(status: StatusCode) -> RecapOutcome {
    if status == StatusCode::OK {
        RecapOutcome::Success
    } else {
        RecapOutcome::RemoteFailure(status.as_u16())
    }
}

/// JSON body sent to the recap endpoint.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecapRequest<'a> {
    /// Sender identifier.
    pub identifier: &'a str,
    /// Facilitator display name.
    pub display_name: &'a str,
}

/// Anything able to kick off a recap computation.
#[async_trait]
pub trait RecapService: Send + Sync {
    /// Ask the remote to compute a recap for this facilitator.
    async fn trigger_recap(&self, identifier: &str, display_name: &str) -> RecapOutcome;
}

/// HTTP implementation of [`RecapService`].
#[derive(Debug, Clone)]
pub struct HttpRecapService {
    client: reqwest::Client,
    url: String,
}

impl HttpRecapService {
    /// Build a service posting to `url` with the given timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    /// Build from the `[recap]` config section.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &RecapConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.url.clone(), Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl RecapService for HttpRecapService {
    async fn trigger_recap(&self, identifier: &str, display_name: &str) -> RecapOutcome {
        let body = RecapRequest {
            identifier,
            display_name,
        };

        let outcome = match self.client.post(&self.url).json(&body).send().await {
            Ok(response) => classify_status(response.status()),
            Err(e) => RecapOutcome::TransportError(e.to_string()),
        };

        match &outcome {
            RecapOutcome::Success => debug!(identifier, "recap accepted"),
            RecapOutcome::RemoteFailure(status) => {
                warn!(identifier, status, url = %self.url, "recap endpoint rejected request");
            }
            RecapOutcome::TransportError(error) => {
                warn!(identifier, error = %error, url = %self.url, "recap request failed");
            }
        }
        outcome
    }
}
