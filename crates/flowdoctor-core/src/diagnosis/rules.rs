//! The ordered rule table used to classify node errors.

use std::sync::LazyLock;

use flowdoctor_models::LogEntry;
use regex::Regex;

use super::types::{Issue, IssueKind, Severity};

/// Where an issue's message comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSource {
    /// `output.userMessage`, else the given text.
    UserMessageOr(&'static str),
    /// `output.revertReason`, else the given text.
    RevertReasonOr(&'static str),
    /// Always the given text.
    Fixed(&'static str),
    /// The raw error string.
    ErrorText,
}

impl MessageSource {
    fn resolve(&self, log: &LogEntry, error: &str) -> String {
        match self {
            MessageSource::UserMessageOr(default) => {
                log.user_message().unwrap_or(*default).to_string()
            }
            MessageSource::RevertReasonOr(default) => {
                log.revert_reason().unwrap_or(*default).to_string()
            }
            MessageSource::Fixed(text) => text.to_string(),
            MessageSource::ErrorText => error.to_string(),
        }
    }
}

/// Static description of one classification rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    /// Case-insensitive regex matched against the error text.
    pub pattern: &'static str,
    pub kind: IssueKind,
    pub retryable: bool,
    pub severity: Severity,
    pub message: MessageSource,
    pub fix: &'static str,
}

/// The rule table, in evaluation order.
pub const RULE_SPECS: &[RuleSpec] = &[
    RuleSpec {
        pattern: r"504|502|503|ETIMEDOUT|ECONNREFUSED|rate limit|429",
        kind: IssueKind::Network,
        retryable: true,
        severity: Severity::Medium,
        message: MessageSource::UserMessageOr("Temporary network issue"),
        fix: "Wait a moment and retry the automation",
    },
    RuleSpec {
        pattern: r"insufficient funds",
        kind: IssueKind::InsufficientFunds,
        retryable: false,
        severity: Severity::High,
        message: MessageSource::Fixed("Wallet has insufficient funds for this transaction"),
        fix: "Fund your wallet or reduce the transaction amount",
    },
    RuleSpec {
        pattern: r"INSUFFICIENT_OUTPUT_AMOUNT|slippage",
        kind: IssueKind::Slippage,
        retryable: true,
        severity: Severity::Medium,
        message: MessageSource::RevertReasonOr("Slippage issue - price moved during execution"),
        fix: "Increase slippage tolerance (try 2-3%) or reduce swap amount",
    },
    RuleSpec {
        pattern: r"execution reverted",
        kind: IssueKind::Reverted,
        retryable: false,
        severity: Severity::High,
        message: MessageSource::RevertReasonOr("Transaction would revert"),
        fix: "Check your parameters and try again with different values",
    },
    RuleSpec {
        pattern: r"Variable.*not found",
        kind: IssueKind::MissingVariable,
        retryable: false,
        severity: Severity::High,
        message: MessageSource::ErrorText,
        fix: "Add a Variable node before this node to set the variable",
    },
    RuleSpec {
        pattern: r"Previous node output|no previous node output",
        kind: IssueKind::MissingInput,
        retryable: false,
        severity: Severity::High,
        message: MessageSource::ErrorText,
        fix: "Use this only after a node that produces output (like checkBalance)",
    },
    RuleSpec {
        pattern: r"For-Each|forEach",
        kind: IssueKind::Foreach,
        retryable: false,
        severity: Severity::High,
        message: MessageSource::ErrorText,
        fix: "Move the node inside the For-Each block or remove the sentinel",
    },
];

/// A rule with its pattern compiled.
#[derive(Debug, Clone)]
pub struct Rule {
    pub regex: Regex,
    pub spec: RuleSpec,
}

impl Rule {
    /// Compile a rule; the pattern is matched case-insensitively.
    pub fn compile(spec: RuleSpec) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("(?i){}", spec.pattern))?;
        Ok(Self { regex, spec })
    }

    pub fn matches(&self, error: &str) -> bool {
        self.regex.is_match(error)
    }

    /// Build the issue this rule contributes for `log`.
    pub fn issue(&self, log: &LogEntry, error: &str) -> Issue {
        Issue::new(
            self.spec.kind,
            self.spec.message.resolve(log, error),
            self.spec.fix,
            self.spec.retryable,
            self.spec.severity,
        )
    }
}

static DEFAULT_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    RULE_SPECS
        .iter()
        .map(|spec| Rule::compile(*spec).expect("Invalid rule pattern"))
        .collect()
});

/// The compiled default rule table.
pub fn default_rules() -> &'static [Rule] {
    &DEFAULT_RULES
}

/// Apply every rule to `error`, in order. Matches are additive.
pub fn classify_error(rules: &[Rule], log: &LogEntry, error: &str) -> Vec<Issue> {
    rules
        .iter()
        .filter(|rule| rule.matches(error))
        .map(|rule| rule.issue(log, error))
        .collect()
}

/// Fallback issue when no rule matched a node error.
pub fn unclassified_issue(log: &LogEntry, error: &str) -> Issue {
    let message = log
        .user_message()
        .map(str::to_string)
        .or_else(|| Some(error.trim().to_string()).filter(|e| !e.is_empty()))
        .unwrap_or_else(|| "Unknown error occurred".to_string());

    Issue::new(
        IssueKind::Unknown,
        message,
        "Review your automation configuration and try again",
        false,
        Severity::Medium,
    )
}
