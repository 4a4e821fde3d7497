//! HTTP API for flowdoctor.
//!
//! Exposes the diagnosis of an automation's latest execution and read-only
//! projections of the automation itself:
//! - `GET /api/debug/:id` - diagnosis, report and assistant analysis
//! - `GET /api/automation/:id[/definition|/executions|/nodes|/summary]`
//! - `GET /api/health`
//!
//! # Example
//!
//! ```ignore
//! use flowdoctor_api::{serve, ApiConfig, AppState};
//! use flowdoctor_core::{Assistant, AutomationClient, Settings};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env();
//!     let client = AutomationClient::from_settings(&settings)?;
//!     let state = AppState::new(ApiConfig::default(), Arc::new(client), Assistant::from_settings(&settings));
//!
//!     serve(state).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod types;

pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use router::{create_router, serve};
pub use state::AppState;
