//! HTTP client for the automation platform API.
//!
//! The platform exposes each automation, including its definition and
//! embedded execution history, at `GET {endpoint}/{id}?password={secret}`.

use std::time::Duration;

use async_trait::async_trait;
use flowdoctor_models::AutomationRecord;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::Settings;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors raised while fetching an automation.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Automation not found: {0}")]
    NotFound(String),

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Failed to decode automation: {0}")]
    Decode(String),
}

/// Anything that can look up an automation by id.
///
/// Failures are reported as `None`; the caller only learns that the
/// automation is unavailable.
#[async_trait]
pub trait AutomationSource: Send + Sync {
    async fn automation(&self, id: &str) -> Option<AutomationRecord>;
}

/// reqwest-backed client for the platform API.
#[derive(Debug, Clone)]
pub struct AutomationClient {
    client: reqwest::Client,
    endpoint: Url,
    password: Option<String>,
}

impl AutomationClient {
    /// Create a client for `endpoint` with the default timeout.
    pub fn new(endpoint: &str, password: Option<String>) -> Result<Self, FetchError> {
        Self::with_timeout(endpoint, password, DEFAULT_TIMEOUT)
    }

    /// Create a client with an explicit request timeout.
    pub fn with_timeout(
        endpoint: &str,
        password: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|e| FetchError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(FetchError::InvalidEndpoint(endpoint.to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            password,
        })
    }

    /// Create a client from shared settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        Self::new(&settings.api_url, settings.api_password.clone())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// URL of a single automation.
    fn automation_url(&self, id: &str) -> Result<Url, FetchError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .push(id);
        if let Some(password) = &self.password {
            url.query_pairs_mut().append_pair("password", password);
        }
        Ok(url)
    }

    /// Fetch one automation with its full execution history.
    pub async fn fetch(&self, id: &str) -> Result<AutomationRecord, FetchError> {
        let url = self.automation_url(id)?;
        debug!(automation_id = %id, "Fetching automation");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let mut automation: AutomationRecord = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        if automation.id.is_empty() {
            automation.id = id.to_string();
        }

        debug!(
            automation_id = %id,
            executions = automation.executions.len(),
            "Fetched automation"
        );
        Ok(automation)
    }
}

#[async_trait]
impl AutomationSource for AutomationClient {
    async fn automation(&self, id: &str) -> Option<AutomationRecord> {
        match self.fetch(id).await {
            Ok(automation) => Some(automation),
            Err(e) => {
                warn!(automation_id = %id, error = %e, "Failed to fetch automation");
                None
            }
        }
    }
}
