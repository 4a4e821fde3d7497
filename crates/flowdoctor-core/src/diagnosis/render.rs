//! Rendering of a diagnosis as a chat or terminal message.

use std::fmt::Write;

use flowdoctor_models::{AutomationRecord, ExecutionRecord, ExecutionStatus};

use super::types::Diagnosis;

/// Maximum characters of the failing node's input shown in a report.
pub const INPUT_PREVIEW_LIMIT: usize = 500;

/// Number of executions listed under "Recent Executions".
const HISTORY_LIMIT: usize = 5;

const WALLET_NOTE: &str = "Since your wallet is connected to the automation platform, \
review the configuration yourself rather than making changes through this bot.";

/// Output markup for rendered reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// No markup, for terminals and JSON payloads.
    #[default]
    Plain,
    /// Telegram HTML parse mode.
    Html,
}

impl ReportFormat {
    /// Escape free text for this format.
    pub fn escape(&self, s: &str) -> String {
        match self {
            ReportFormat::Plain => s.to_string(),
            ReportFormat::Html => html_escape(s),
        }
    }

    fn bold(&self, s: &str) -> String {
        match self {
            ReportFormat::Plain => s.to_string(),
            ReportFormat::Html => format!("<b>{}</b>", html_escape(s)),
        }
    }

    fn code(&self, s: &str) -> String {
        match self {
            ReportFormat::Plain => s.to_string(),
            ReportFormat::Html => format!("<code>{}</code>", html_escape(s)),
        }
    }

    fn pre(&self, s: &str) -> String {
        match self {
            ReportFormat::Plain => s.to_string(),
            ReportFormat::Html => format!("<pre>{}</pre>", html_escape(s)),
        }
    }
}

/// Escape HTML special characters for Telegram HTML mode.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render a full debug report for `automation`.
pub fn render_report(
    automation: &AutomationRecord,
    diagnosis: &Diagnosis,
    format: ReportFormat,
) -> String {
    let f = format;
    let mut out = String::new();

    let _ = writeln!(out, "🔍 {}\n", f.bold("Automation Debug Report"));
    let _ = writeln!(
        out,
        "📊 {}: {}",
        f.bold("Automation"),
        f.escape(automation.display_name())
    );

    if diagnosis.is_empty_history() {
        if let Some(issue) = diagnosis.primary() {
            let _ = writeln!(out, "\n{}", f.escape(&issue.message));
            let _ = writeln!(out, "💡 Fix: {}", f.escape(&issue.fix));
        }
        return out;
    }

    let _ = writeln!(
        out,
        "📅 {}: {}",
        f.bold("Last Run"),
        f.escape(&format_timestamp(diagnosis.started_at.as_deref()))
    );
    let status = diagnosis
        .status
        .as_ref()
        .map(|s| s.as_str())
        .unwrap_or("UNKNOWN");
    let _ = writeln!(out, "📈 {}: {}", f.bold("Status"), f.escape(status));

    if let Some(node) = &diagnosis.failing_node {
        let _ = writeln!(out, "\n❌ {}: {}", f.bold("Failed Node"), f.escape(&node.node_type));
        if let Some(notes) = node.notes() {
            let _ = writeln!(out, "📝 {}: {}", f.bold("Notes"), f.escape(notes));
        }
    }

    let _ = writeln!(out, "\n🔴 {}:", f.bold("Issues Found"));
    for (idx, issue) in diagnosis.issues.iter().enumerate() {
        let tag = issue.kind.as_str().to_uppercase();
        let retry = if issue.retryable { " (retryable)" } else { "" };
        let _ = writeln!(out, "{}. {}{}", idx + 1, f.bold(&tag), retry);
        let _ = writeln!(out, "   {}", f.escape(&issue.message));
        let _ = writeln!(out, "   💡 Fix: {}\n", f.escape(&issue.fix));
    }

    if let Some(input) = diagnosis.failing_log.as_ref().and_then(|l| l.input.as_ref()) {
        let pretty = serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string());
        let _ = writeln!(out, "📋 {}:", f.bold("Node Input"));
        let _ = writeln!(out, "{}", f.pre(&truncate_chars(&pretty, INPUT_PREVIEW_LIMIT)));
    }

    let history = automation.recent_executions(HISTORY_LIMIT);
    if !history.is_empty() {
        let _ = writeln!(out, "\n📜 {}:", f.bold("Recent Executions"));
        for execution in history {
            let _ = writeln!(out, "{}", history_line(execution, f));
        }
    }

    let _ = write!(out, "\n⚠️ {}: {}", f.bold("Note"), WALLET_NOTE);
    out
}

/// Message for an automation the fetch collaborator could not return.
pub fn render_not_found(automation_id: &str, format: ReportFormat) -> String {
    format!(
        "❌ Could not fetch automation {}\n\n\
        Please verify:\n\
        - The ID is correct\n\
        - The automation exists\n\n\
        Try again or contact support.",
        format.code(automation_id)
    )
}

fn history_line(execution: &ExecutionRecord, f: ReportFormat) -> String {
    let marker = match execution.status {
        ExecutionStatus::Success => "✅",
        ExecutionStatus::Failed => "❌",
        _ => "⏸️",
    };
    format!(
        "{} {} - {}",
        marker,
        f.escape(&format_timestamp(execution.started_at.as_deref())),
        f.escape(execution.status.as_str())
    )
}

/// Format a raw start time for display.
pub fn format_timestamp(raw: Option<&str>) -> String {
    match raw {
        Some(raw) => chrono::DateTime::parse_from_rfc3339(raw)
            .map(|dt| {
                dt.with_timezone(&chrono::Utc)
                    .format("%Y-%m-%d %H:%M:%S UTC")
                    .to_string()
            })
            .unwrap_or_else(|_| raw.to_string()),
        None => "unknown".to_string(),
    }
}

/// Keep at most `limit` characters, respecting char boundaries.
pub fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}
