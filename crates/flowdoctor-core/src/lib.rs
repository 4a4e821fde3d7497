//! flowdoctor core - shared logic for the CLI, the HTTP API and the bot.
//!
//! - **diagnosis**: classify why an execution failed and render the result
//! - **reference**: extract automation ids from ids and URLs
//! - **client**: fetch automations from the platform API
//! - **summary**: run statistics for an automation
//! - **assistant**: conversational explanations with rule-based fallback
//! - **config**: state paths and runtime settings

pub mod assistant;
pub mod client;
pub mod config;
pub mod diagnosis;
pub mod reference;
pub mod summary;

pub use assistant::{
    AnswerContext, Assistant, AssistantError, ChatMessage, ChatRole, CompletionBackend,
    OpenRouterBackend,
};
pub use client::{AutomationClient, AutomationSource, FetchError};
pub use config::{config_dir, env_file, ensure_all_dirs, load_env, state_dir, Settings};
pub use diagnosis::{
    diagnose, render_not_found, render_report, Diagnoser, Diagnosis, Issue, IssueFamily,
    IssueKind, ReportFormat, Severity,
};
pub use reference::{is_automation_ref, parse_automation_ref};
pub use summary::AutomationSummary;
