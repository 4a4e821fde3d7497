//! Application state shared across handlers.

use std::sync::Arc;

use flowdoctor_core::{Assistant, AutomationSource};
use flowdoctor_models::AutomationRecord;

use crate::config::ApiConfig;
use crate::error::{ApiError, Result};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// Where automations are fetched from.
    pub source: Arc<dyn AutomationSource>,
    /// Conversational explanations; disabled means rule-based only.
    pub assistant: Arc<Assistant>,
}

impl AppState {
    pub fn new(config: ApiConfig, source: Arc<dyn AutomationSource>, assistant: Assistant) -> Self {
        Self {
            config: Arc::new(config),
            source,
            assistant: Arc::new(assistant),
        }
    }

    /// Fetch an automation, mapping absence to a 404.
    pub async fn automation(&self, id: &str) -> Result<AutomationRecord> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ApiError::BadRequest("automation id required".to_string()));
        }
        self.source
            .automation(id)
            .await
            .ok_or_else(|| ApiError::automation_not_found(id))
    }
}
