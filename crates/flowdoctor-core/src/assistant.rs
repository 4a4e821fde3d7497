//! Conversational explanations through a chat-completion backend.
//!
//! The assistant never replaces the rule-based diagnosis. Every prompt
//! carries the diagnosis as context, and the `*_or_fallback` methods return
//! the rendered report whenever the backend is missing or fails.

use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use flowdoctor_models::{AutomationRecord, NodeRecord};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::diagnosis::{render_report, Diagnosis, ReportFormat};

/// Characters of the debugging guide included in the system prompt.
pub const GUIDE_EXCERPT_LIMIT: usize = 3000;

/// Default `max_tokens` for completions.
pub const DEFAULT_MAX_TOKENS: u32 = 400;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_PROMPT: &str = r#"You are an expert at debugging automations on a no-code crypto automation platform.
You receive the automation, the failing step and the findings of a rule-based checker.

Rules:
- Explain what went wrong in plain language
- Give one concrete fix the user can apply in the automation editor
- Never ask for private keys or wallet access
- Be concise"#;

const NO_CONTEXT_HINT: &str = "Send an automation ID or link and I'll check its latest run. \
Free-form questions need an assistant backend, which is not configured.";

/// `Type (nodeId): ...` prefix of a top-level execution error.
static ERROR_NODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^(]+)\(([^)]+)\)").expect("Invalid error node regex"));

/// Errors that can occur while asking the backend.
#[derive(Error, Debug)]
pub enum AssistantError {
    /// No completion backend configured.
    #[error("No assistant backend configured")]
    NoBackend,

    /// API request failed.
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Backend answered with a non-success status.
    #[error("Assistant API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Failed to parse API response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Debugging guide could not be read.
    #[error("Failed to read guide: {0}")]
    Guide(#[from] std::io::Error),
}

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A message in a chat-completion conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A chat-completion service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AssistantError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenRouter (OpenAI-compatible) chat-completion backend.
#[derive(Debug, Clone)]
pub struct OpenRouterBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl OpenRouterBackend {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, AssistantError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AssistantError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    /// Build a backend when an API key is configured.
    pub fn from_settings(settings: &Settings) -> Option<Result<Self, AssistantError>> {
        let api_key = settings.openrouter_api_key.as_deref()?;
        Some(Self::new(
            api_key,
            &settings.openrouter_base_url,
            &settings.openrouter_model,
        ))
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionBackend for OpenRouterBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AssistantError> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "flowdoctor")
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let response: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::ParseError(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AssistantError::ParseError("No content in response".to_string()))
    }
}

/// Automation and diagnosis a free-form question is asked about.
#[derive(Debug, Clone, Copy)]
pub struct AnswerContext<'a> {
    pub automation: &'a AutomationRecord,
    pub diagnosis: &'a Diagnosis,
}

/// Chat assistant with an optional backend and debugging guide.
#[derive(Clone, Default)]
pub struct Assistant {
    backend: Option<Arc<dyn CompletionBackend>>,
    guide: Option<String>,
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("enabled", &self.is_enabled())
            .field("guide_chars", &self.guide.as_ref().map(|g| g.chars().count()))
            .finish()
    }
}

impl Assistant {
    /// Assistant without a backend; every answer is the fallback.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend: Some(backend),
            guide: None,
        }
    }

    /// Attach a debugging guide; only the first excerpt is kept.
    pub fn with_guide(mut self, guide: &str) -> Self {
        let excerpt: String = guide.chars().take(GUIDE_EXCERPT_LIMIT).collect();
        self.guide = Some(excerpt).filter(|g| !g.trim().is_empty());
        self
    }

    /// Attach the debugging guide stored at `path`.
    pub fn with_guide_file(self, path: &Path) -> Result<Self, AssistantError> {
        let guide = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), chars = guide.chars().count(), "Loaded debugging guide");
        Ok(self.with_guide(&guide))
    }

    /// Build from settings. Backend or guide problems disable that part only.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut assistant = match OpenRouterBackend::from_settings(settings) {
            Some(Ok(backend)) => Self::new(Arc::new(backend)),
            Some(Err(e)) => {
                warn!(error = %e, "Assistant backend unavailable, using rule-based replies");
                Self::disabled()
            }
            None => Self::disabled(),
        };

        if let Some(path) = &settings.guide_path {
            assistant = match assistant.clone().with_guide_file(path) {
                Ok(with_guide) => with_guide,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Debugging guide not loaded");
                    assistant
                }
            };
        }
        assistant
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn guide(&self) -> Option<&str> {
        self.guide.as_deref()
    }

    fn system_message(&self) -> ChatMessage {
        match &self.guide {
            Some(guide) => ChatMessage::system(format!(
                "{SYSTEM_PROMPT}\n\nUse this debugging guide:\n\n{guide}"
            )),
            None => ChatMessage::system(SYSTEM_PROMPT),
        }
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AssistantError> {
        let backend = self.backend.as_ref().ok_or(AssistantError::NoBackend)?;
        backend.complete(messages).await
    }

    /// Ask the backend to explain the diagnosis of `automation`.
    pub async fn explain(
        &self,
        automation: &AutomationRecord,
        diagnosis: &Diagnosis,
    ) -> Result<String, AssistantError> {
        let messages = vec![
            self.system_message(),
            ChatMessage::user(format!(
                "{}\n\nWhat's wrong? Fix it. Be concise.",
                describe(automation, diagnosis)
            )),
        ];
        self.complete(&messages).await
    }

    /// [`explain`](Self::explain), falling back to the rendered report.
    ///
    /// Backend text is escaped for `format`.
    pub async fn explain_or_fallback(
        &self,
        automation: &AutomationRecord,
        diagnosis: &Diagnosis,
        format: ReportFormat,
    ) -> String {
        if !self.is_enabled() {
            return render_report(automation, diagnosis, format);
        }
        match self.explain(automation, diagnosis).await {
            Ok(text) => format.escape(&text),
            Err(e) => {
                warn!(automation_id = %automation.id, error = %e, "Explanation failed, using report");
                render_report(automation, diagnosis, format)
            }
        }
    }

    /// Answer a free-form question, optionally about one automation.
    ///
    /// `history` holds earlier turns of the same chat, oldest first.
    pub async fn answer(
        &self,
        question: &str,
        context: Option<AnswerContext<'_>>,
        history: &[ChatMessage],
    ) -> Result<String, AssistantError> {
        let mut messages = vec![self.system_message()];
        if let Some(ctx) = context {
            messages.push(ChatMessage::system(format!(
                "The user is asking about this automation:\n\n{}",
                describe(ctx.automation, ctx.diagnosis)
            )));
        }
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(question));
        self.complete(&messages).await
    }

    /// [`answer`](Self::answer), falling back to the report or a fixed hint.
    pub async fn answer_or_fallback(
        &self,
        question: &str,
        context: Option<AnswerContext<'_>>,
        history: &[ChatMessage],
        format: ReportFormat,
    ) -> String {
        let fallback = || match context {
            Some(ctx) => render_report(ctx.automation, ctx.diagnosis, format),
            None => format.escape(NO_CONTEXT_HINT),
        };

        if !self.is_enabled() {
            return fallback();
        }
        match self.answer(question, context, history).await {
            Ok(text) => format.escape(&text),
            Err(e) => {
                warn!(error = %e, "Answer failed, using fallback");
                fallback()
            }
        }
    }
}

/// Node named by a `Type (nodeId): ...` top-level error.
fn node_from_error<'a>(
    automation: &'a AutomationRecord,
    error: &str,
) -> (Option<String>, Option<&'a NodeRecord>) {
    let Some(caps) = ERROR_NODE.captures(error) else {
        return (None, None);
    };
    let node_type = caps.get(1).map(|m| m.as_str().trim().to_string());
    let node = caps
        .get(2)
        .and_then(|m| automation.find_node(m.as_str().trim()));
    (node_type, node)
}

/// Prompt block describing the automation and its diagnosis.
fn describe(automation: &AutomationRecord, diagnosis: &Diagnosis) -> String {
    let latest = automation.latest_execution();
    let status = diagnosis
        .status
        .as_ref()
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let error = diagnosis
        .failing_log
        .as_ref()
        .and_then(|l| l.error.clone())
        .or_else(|| latest.and_then(|e| e.error.clone()))
        .unwrap_or_else(|| "No error".to_string());

    let (node_type, config) = match &diagnosis.failing_node {
        Some(node) => (node.node_type.clone(), node.config()),
        None => {
            let (node_type, node) = node_from_error(automation, &error);
            (
                node_type
                    .or_else(|| node.map(|n| n.node_type.clone()))
                    .unwrap_or_else(|| "Unknown".to_string()),
                node.map(NodeRecord::config).unwrap_or_else(|| serde_json::json!({})),
            )
        }
    };

    let findings: Vec<String> = diagnosis
        .issues
        .iter()
        .map(|i| format!("- {}: {} (suggested fix: {})", i.kind, i.message, i.fix))
        .collect();

    format!(
        "Automation: \"{}\"\nStatus: {}\nError: {}\nNode: {}\nConfig: {}\n\nRule-based findings:\n{}",
        automation.display_name(),
        status,
        error,
        node_type,
        config,
        findings.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use flowdoctor_models::{AutomationBuilder, ExecutionBuilder};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::diagnosis::Diagnoser;

    /// Backend that records prompts and replies with a fixed text.
    #[derive(Default)]
    struct RecordingBackend {
        reply: Option<String>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl CompletionBackend for RecordingBackend {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AssistantError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            self.reply
                .clone()
                .ok_or_else(|| AssistantError::RequestFailed("offline".into()))
        }
    }

    fn sample() -> (AutomationRecord, Diagnosis) {
        let automation = AutomationBuilder::new("abc")
            .name("DCA")
            .node(NodeRecord {
                id: "n2".into(),
                node_type: "swap".into(),
                data: json!({"config": {"slippage": 0.5}}),
            })
            .execution(
                ExecutionBuilder::new("FAILED")
                    .failed_log("n2", "execution reverted: INSUFFICIENT_OUTPUT_AMOUNT")
                    .build(),
            )
            .build();
        let diagnosis = Diagnoser::new().diagnose_latest(&automation);
        (automation, diagnosis)
    }

    #[tokio::test]
    async fn test_explain_prompt_carries_diagnosis() {
        let backend = Arc::new(RecordingBackend {
            reply: Some("Raise slippage to 2%.".into()),
            ..Default::default()
        });
        let assistant = Assistant::new(backend.clone());
        let (automation, diagnosis) = sample();

        let text = assistant.explain(&automation, &diagnosis).await.unwrap();
        assert_eq!(text, "Raise slippage to 2%.");

        let calls = backend.calls.lock().unwrap();
        let prompt = &calls[0][1].content;
        assert!(prompt.contains("Automation: \"DCA\""));
        assert!(prompt.contains("Node: swap"));
        assert!(prompt.contains("\"slippage\":0.5"));
        assert!(prompt.contains("- slippage:"));
        assert!(prompt.contains("- reverted:"));
        assert!(prompt.ends_with("Be concise."));
    }

    #[tokio::test]
    async fn test_explain_infers_node_from_top_level_error() {
        let backend = Arc::new(RecordingBackend {
            reply: Some("ok".into()),
            ..Default::default()
        });
        let assistant = Assistant::new(backend.clone());
        let automation = AutomationBuilder::new("abc")
            .node(NodeRecord {
                id: "n7".into(),
                node_type: "transfer".into(),
                data: json!({"config": {"to": "0xabc"}}),
            })
            .execution(
                ExecutionBuilder::new("FAILED")
                    .error("Transfer (n7): amount exceeds balance")
                    .build(),
            )
            .build();
        let diagnosis = Diagnoser::new().diagnose_latest(&automation);
        assistant.explain(&automation, &diagnosis).await.unwrap();

        let calls = backend.calls.lock().unwrap();
        let prompt = &calls[0][1].content;
        assert!(prompt.contains("Node: Transfer"));
        assert!(prompt.contains("\"to\":\"0xabc\""));
    }

    #[tokio::test]
    async fn test_explain_fallback_without_backend() {
        let (automation, diagnosis) = sample();
        let text = Assistant::disabled()
            .explain_or_fallback(&automation, &diagnosis, ReportFormat::Plain)
            .await;
        assert_eq!(text, render_report(&automation, &diagnosis, ReportFormat::Plain));
    }

    #[tokio::test]
    async fn test_explain_fallback_on_backend_error() {
        let backend = Arc::new(RecordingBackend::default());
        let assistant = Assistant::new(backend.clone());
        let (automation, diagnosis) = sample();

        let text = assistant
            .explain_or_fallback(&automation, &diagnosis, ReportFormat::Html)
            .await;
        assert_eq!(text, render_report(&automation, &diagnosis, ReportFormat::Html));
        assert_eq!(backend.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_text_escaped_for_html() {
        let backend = Arc::new(RecordingBackend {
            reply: Some("Set amount <= balance & retry".into()),
            ..Default::default()
        });
        let (automation, diagnosis) = sample();
        let text = Assistant::new(backend)
            .explain_or_fallback(&automation, &diagnosis, ReportFormat::Html)
            .await;
        assert_eq!(text, "Set amount &lt;= balance &amp; retry");
    }

    #[tokio::test]
    async fn test_answer_includes_context_and_history() {
        let backend = Arc::new(RecordingBackend {
            reply: Some("Because the price moved.".into()),
            ..Default::default()
        });
        let assistant = Assistant::new(backend.clone()).with_guide("Swaps need slippage.");
        let (automation, diagnosis) = sample();
        let history = vec![
            ChatMessage::user("what happened?"),
            ChatMessage::assistant("The swap reverted."),
        ];

        let context = AnswerContext {
            automation: &automation,
            diagnosis: &diagnosis,
        };
        let text = assistant
            .answer("why?", Some(context), &history)
            .await
            .unwrap();
        assert_eq!(text, "Because the price moved.");

        let calls = backend.calls.lock().unwrap();
        let messages = &calls[0];
        assert_eq!(messages.len(), 5);
        assert!(messages[0].content.contains("Swaps need slippage."));
        assert!(messages[1].content.contains("Automation: \"DCA\""));
        assert_eq!(messages[2], history[0]);
        assert_eq!(messages[4], ChatMessage::user("why?"));
    }

    #[tokio::test]
    async fn test_answer_fallback_without_context() {
        let text = Assistant::disabled()
            .answer_or_fallback("hello", None, &[], ReportFormat::Plain)
            .await;
        assert_eq!(text, NO_CONTEXT_HINT);
    }

    #[tokio::test]
    async fn test_answer_without_backend_errors() {
        let result = Assistant::disabled().answer("hello", None, &[]).await;
        assert!(matches!(result, Err(AssistantError::NoBackend)));
    }

    #[test]
    fn test_guide_excerpt_is_limited() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", "g".repeat(GUIDE_EXCERPT_LIMIT + 2000)).unwrap();

        let assistant = Assistant::disabled().with_guide_file(file.path()).unwrap();
        assert_eq!(
            assistant.guide().unwrap().chars().count(),
            GUIDE_EXCERPT_LIMIT
        );
    }

    #[test]
    fn test_missing_guide_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Assistant::disabled().with_guide_file(&dir.path().join("nope.md"));
        assert!(matches!(result, Err(AssistantError::Guide(_))));
    }

    #[test]
    fn test_from_settings_tolerates_missing_guide() {
        let settings = Settings {
            guide_path: Some("/nonexistent/guide.md".into()),
            ..Settings::default()
        };
        let assistant = Assistant::from_settings(&settings);
        assert!(!assistant.is_enabled());
        assert!(assistant.guide().is_none());
    }

    #[tokio::test]
    async fn test_openrouter_backend_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "  Fund the wallet.  "}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend =
            OpenRouterBackend::new("sk-test", format!("{}/api/v1/", server.uri()), "test/model")
                .unwrap();
        let text = backend
            .complete(&[ChatMessage::user("help")])
            .await
            .unwrap();
        assert_eq!(text, "Fund the wallet.");
    }

    #[tokio::test]
    async fn test_openrouter_backend_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let backend = OpenRouterBackend::new("sk-bad", server.uri(), "test/model").unwrap();
        let result = backend.complete(&[ChatMessage::user("help")]).await;
        assert!(matches!(
            result,
            Err(AssistantError::Api { status: 401, ref body }) if body == "bad key"
        ));
    }

    #[tokio::test]
    async fn test_openrouter_backend_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let backend = OpenRouterBackend::new("sk-test", server.uri(), "test/model").unwrap();
        let result = backend.complete(&[ChatMessage::user("help")]).await;
        assert!(matches!(result, Err(AssistantError::ParseError(_))));
    }
}
