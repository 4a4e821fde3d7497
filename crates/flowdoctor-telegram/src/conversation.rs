//! Conversation state machine for a single chat.
//!
//! Every incoming text is first classified into an [`Input`] relative to the
//! current [`ConversationState`], then [`transition`] yields the next state
//! and the [`Action`] the bot should perform. Both steps are pure.
//!
//! ```text
//!   Idle ──Debug──▶ AwaitingAutomationId ──ref──▶ Chatting{id}
//!    ▲                                              │
//!    └──────── confirm reset ◀── AwaitingConfirmation ◀── other ref / Reset
//! ```

use flowdoctor_core::parse_automation_ref;

/// Reply-keyboard label of the Debug button.
pub const DEBUG_LABEL: &str = "🔍 Debug";
/// Reply-keyboard label of the Ask button.
pub const ASK_LABEL: &str = "💬 Ask";
/// Reply-keyboard label of the Reset button.
pub const RESET_LABEL: &str = "🔄 Reset";
/// Reply-keyboard label of the Help button.
pub const HELP_LABEL: &str = "❓ Help";

/// Inline-button labels and callback payloads for confirmations.
pub const CONFIRM_YES_LABEL: &str = "✅ Yes";
pub const CONFIRM_NO_LABEL: &str = "❌ No";
pub const CONFIRM_YES_DATA: &str = "confirm:yes";
pub const CONFIRM_NO_DATA: &str = "confirm:no";

/// What a pending confirmation would do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmPurpose {
    /// Drop the current automation and diagnose another one.
    SwitchAutomation { automation_id: String },
    /// Forget the current automation and chat history.
    ResetConversation,
}

/// Where a chat currently is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingAutomationId,
    Chatting {
        automation_id: String,
    },
    AwaitingConfirmation {
        purpose: ConfirmPurpose,
        previous: Box<ConversationState>,
    },
}

impl ConversationState {
    /// Automation the chat is focused on, including behind a confirmation.
    pub fn automation_id(&self) -> Option<&str> {
        match self {
            ConversationState::Chatting { automation_id } => Some(automation_id.as_str()),
            ConversationState::AwaitingConfirmation { previous, .. } => previous.automation_id(),
            _ => None,
        }
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        matches!(self, ConversationState::AwaitingConfirmation { .. })
    }

    /// Short label for /status.
    pub fn describe(&self) -> &'static str {
        match self {
            ConversationState::Idle => "idle",
            ConversationState::AwaitingAutomationId => "waiting for an automation ID",
            ConversationState::Chatting { .. } => "chatting",
            ConversationState::AwaitingConfirmation { .. } => "waiting for confirmation",
        }
    }
}

/// Reply-keyboard menu items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Debug,
    Ask,
    Reset,
    Help,
}

impl MenuItem {
    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::Debug => DEBUG_LABEL,
            MenuItem::Ask => ASK_LABEL,
            MenuItem::Reset => RESET_LABEL,
            MenuItem::Help => HELP_LABEL,
        }
    }

    /// Match a button label or its bare word, case-insensitively.
    pub fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        [MenuItem::Debug, MenuItem::Ask, MenuItem::Reset, MenuItem::Help]
            .into_iter()
            .find(|item| {
                let label = item.label();
                let word = label.split_once(' ').map(|(_, w)| w).unwrap_or(label);
                text == label || text.eq_ignore_ascii_case(word)
            })
    }
}

/// A classified user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Menu(MenuItem),
    AutomationRef(String),
    Confirm(bool),
    FreeText(String),
}

/// What the bot should do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ShowHelp,
    ShowMenu,
    PromptForId,
    PromptForQuestion { automation_id: String },
    Diagnose { automation_id: String },
    Answer {
        automation_id: Option<String>,
        question: String,
    },
    AskConfirmation(ConfirmPurpose),
    ResetDone,
    Cancelled,
    InvalidId,
    /// A confirmation arrived while none was pending.
    Stale,
}

fn confirmation_word(text: &str) -> Option<bool> {
    let text = text.trim();
    if text == CONFIRM_YES_LABEL {
        return Some(true);
    }
    if text == CONFIRM_NO_LABEL {
        return Some(false);
    }
    match text.to_ascii_lowercase().as_str() {
        "yes" | "y" | "ok" | "confirm" => Some(true),
        "no" | "n" | "cancel" => Some(false),
        _ => None,
    }
}

/// Classify `text` relative to `state`.
pub fn classify(text: &str, state: &ConversationState) -> Input {
    if state.is_awaiting_confirmation() {
        if let Some(answer) = confirmation_word(text) {
            return Input::Confirm(answer);
        }
    }
    if let Some(item) = MenuItem::from_text(text) {
        return Input::Menu(item);
    }
    if let Some(id) = parse_automation_ref(text) {
        return Input::AutomationRef(id);
    }
    Input::FreeText(text.trim().to_string())
}

/// Classify an inline-button payload.
pub fn classify_callback(data: &str) -> Option<Input> {
    match data {
        CONFIRM_YES_DATA => Some(Input::Confirm(true)),
        CONFIRM_NO_DATA => Some(Input::Confirm(false)),
        _ => None,
    }
}

/// Compute the next state and action.
pub fn transition(state: ConversationState, input: Input) -> (ConversationState, Action) {
    use ConversationState as S;

    match (state, input) {
        (state, Input::Menu(MenuItem::Help)) => (state, Action::ShowHelp),

        (S::AwaitingConfirmation { purpose, .. }, Input::Confirm(true)) => match purpose {
            ConfirmPurpose::SwitchAutomation { automation_id } => (
                S::Chatting {
                    automation_id: automation_id.clone(),
                },
                Action::Diagnose { automation_id },
            ),
            ConfirmPurpose::ResetConversation => (S::Idle, Action::ResetDone),
        },
        (S::AwaitingConfirmation { previous, .. }, Input::Confirm(false)) => {
            (*previous, Action::Cancelled)
        }
        (S::AwaitingConfirmation { previous, .. }, Input::Menu(MenuItem::Reset)) => {
            let purpose = ConfirmPurpose::ResetConversation;
            (
                S::AwaitingConfirmation {
                    purpose: purpose.clone(),
                    previous,
                },
                Action::AskConfirmation(purpose),
            )
        }
        (S::AwaitingConfirmation { purpose, previous }, _) => {
            let action = Action::AskConfirmation(purpose.clone());
            (S::AwaitingConfirmation { purpose, previous }, action)
        }
        (state, Input::Confirm(_)) => (state, Action::Stale),

        (S::Idle, Input::Menu(MenuItem::Reset)) => (S::Idle, Action::ShowMenu),
        (state, Input::Menu(MenuItem::Reset)) => {
            let purpose = ConfirmPurpose::ResetConversation;
            (
                S::AwaitingConfirmation {
                    purpose: purpose.clone(),
                    previous: Box::new(state),
                },
                Action::AskConfirmation(purpose),
            )
        }

        (S::Chatting { automation_id }, Input::Menu(MenuItem::Debug)) => (
            S::Chatting {
                automation_id: automation_id.clone(),
            },
            Action::Diagnose { automation_id },
        ),
        (_, Input::Menu(MenuItem::Debug)) => (S::AwaitingAutomationId, Action::PromptForId),

        (S::Chatting { automation_id }, Input::Menu(MenuItem::Ask)) => (
            S::Chatting {
                automation_id: automation_id.clone(),
            },
            Action::PromptForQuestion { automation_id },
        ),
        (_, Input::Menu(MenuItem::Ask)) => (S::AwaitingAutomationId, Action::PromptForId),

        (S::Chatting { automation_id }, Input::AutomationRef(id)) if automation_id == id => (
            S::Chatting { automation_id },
            Action::Diagnose { automation_id: id },
        ),
        (state @ S::Chatting { .. }, Input::AutomationRef(id)) => {
            let purpose = ConfirmPurpose::SwitchAutomation { automation_id: id };
            (
                S::AwaitingConfirmation {
                    purpose: purpose.clone(),
                    previous: Box::new(state),
                },
                Action::AskConfirmation(purpose),
            )
        }
        (_, Input::AutomationRef(id)) => (
            S::Chatting {
                automation_id: id.clone(),
            },
            Action::Diagnose { automation_id: id },
        ),

        (S::Idle, Input::FreeText(question)) => (
            S::Idle,
            Action::Answer {
                automation_id: None,
                question,
            },
        ),
        (S::AwaitingAutomationId, Input::FreeText(_)) => {
            (S::AwaitingAutomationId, Action::InvalidId)
        }
        (S::Chatting { automation_id }, Input::FreeText(question)) => (
            S::Chatting {
                automation_id: automation_id.clone(),
            },
            Action::Answer {
                automation_id: Some(automation_id),
                question,
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID_A: &str = "cmkwhwr4j0001jp0412bdp8zw";
    const ID_B: &str = "clq9z8y7x6w5v4u3t2s1r0qpo";

    fn chatting(id: &str) -> ConversationState {
        ConversationState::Chatting {
            automation_id: id.to_string(),
        }
    }

    fn confirming(purpose: ConfirmPurpose, previous: ConversationState) -> ConversationState {
        ConversationState::AwaitingConfirmation {
            purpose,
            previous: Box::new(previous),
        }
    }

    #[test]
    fn test_classify_menu_labels() {
        let idle = ConversationState::Idle;
        assert_eq!(classify(DEBUG_LABEL, &idle), Input::Menu(MenuItem::Debug));
        assert_eq!(classify("ask", &idle), Input::Menu(MenuItem::Ask));
        assert_eq!(classify(" RESET ", &idle), Input::Menu(MenuItem::Reset));
        assert_eq!(classify(HELP_LABEL, &idle), Input::Menu(MenuItem::Help));
    }

    #[test]
    fn test_classify_reference_and_text() {
        let idle = ConversationState::Idle;
        assert_eq!(
            classify(&format!("https://pulseflow.co/automations/{ID_A}"), &idle),
            Input::AutomationRef(ID_A.to_string())
        );
        assert_eq!(
            classify("  why did it fail? ", &idle),
            Input::FreeText("why did it fail?".to_string())
        );
    }

    #[test]
    fn test_confirmation_words_only_while_confirming() {
        assert_eq!(
            classify("yes", &ConversationState::Idle),
            Input::FreeText("yes".to_string())
        );

        let state = confirming(ConfirmPurpose::ResetConversation, chatting(ID_A));
        assert_eq!(classify("yes", &state), Input::Confirm(true));
        assert_eq!(classify(CONFIRM_NO_LABEL, &state), Input::Confirm(false));
        assert_eq!(classify("Cancel", &state), Input::Confirm(false));
    }

    #[test]
    fn test_classify_callback() {
        assert_eq!(classify_callback(CONFIRM_YES_DATA), Some(Input::Confirm(true)));
        assert_eq!(classify_callback(CONFIRM_NO_DATA), Some(Input::Confirm(false)));
        assert_eq!(classify_callback("other"), None);
    }

    #[test]
    fn test_help_never_changes_state() {
        let states = [
            ConversationState::Idle,
            ConversationState::AwaitingAutomationId,
            chatting(ID_A),
            confirming(ConfirmPurpose::ResetConversation, chatting(ID_A)),
        ];
        for state in states {
            let (next, action) = transition(state.clone(), Input::Menu(MenuItem::Help));
            assert_eq!(next, state);
            assert_eq!(action, Action::ShowHelp);
        }
    }

    #[test]
    fn test_debug_from_idle_prompts_for_id() {
        let (next, action) = transition(ConversationState::Idle, Input::Menu(MenuItem::Debug));
        assert_eq!(next, ConversationState::AwaitingAutomationId);
        assert_eq!(action, Action::PromptForId);
    }

    #[test]
    fn test_debug_while_chatting_rediagnoses() {
        let (next, action) = transition(chatting(ID_A), Input::Menu(MenuItem::Debug));
        assert_eq!(next, chatting(ID_A));
        assert_eq!(
            action,
            Action::Diagnose {
                automation_id: ID_A.to_string()
            }
        );
    }

    #[test]
    fn test_ask_without_automation_prompts_for_id() {
        let (next, action) = transition(ConversationState::Idle, Input::Menu(MenuItem::Ask));
        assert_eq!(next, ConversationState::AwaitingAutomationId);
        assert_eq!(action, Action::PromptForId);

        let (next, action) = transition(chatting(ID_A), Input::Menu(MenuItem::Ask));
        assert_eq!(next, chatting(ID_A));
        assert_eq!(
            action,
            Action::PromptForQuestion {
                automation_id: ID_A.to_string()
            }
        );
    }

    #[test]
    fn test_reference_starts_chat() {
        for state in [ConversationState::Idle, ConversationState::AwaitingAutomationId] {
            let (next, action) = transition(state, Input::AutomationRef(ID_A.to_string()));
            assert_eq!(next, chatting(ID_A));
            assert_eq!(
                action,
                Action::Diagnose {
                    automation_id: ID_A.to_string()
                }
            );
        }
    }

    #[test]
    fn test_same_reference_rediagnoses() {
        let (next, action) = transition(chatting(ID_A), Input::AutomationRef(ID_A.to_string()));
        assert_eq!(next, chatting(ID_A));
        assert!(matches!(action, Action::Diagnose { .. }));
    }

    #[test]
    fn test_switch_requires_confirmation() {
        let (next, action) = transition(chatting(ID_A), Input::AutomationRef(ID_B.to_string()));
        let purpose = ConfirmPurpose::SwitchAutomation {
            automation_id: ID_B.to_string(),
        };
        assert_eq!(next, confirming(purpose.clone(), chatting(ID_A)));
        assert_eq!(action, Action::AskConfirmation(purpose));
        assert_eq!(next.automation_id(), Some(ID_A));

        let (after_yes, action) = transition(next.clone(), Input::Confirm(true));
        assert_eq!(after_yes, chatting(ID_B));
        assert_eq!(
            action,
            Action::Diagnose {
                automation_id: ID_B.to_string()
            }
        );

        let (after_no, action) = transition(next, Input::Confirm(false));
        assert_eq!(after_no, chatting(ID_A));
        assert_eq!(action, Action::Cancelled);
    }

    #[test]
    fn test_reset_flow() {
        let (next, action) = transition(ConversationState::Idle, Input::Menu(MenuItem::Reset));
        assert_eq!(next, ConversationState::Idle);
        assert_eq!(action, Action::ShowMenu);

        let (next, action) = transition(chatting(ID_A), Input::Menu(MenuItem::Reset));
        assert_eq!(
            action,
            Action::AskConfirmation(ConfirmPurpose::ResetConversation)
        );

        let (after_yes, action) = transition(next, Input::Confirm(true));
        assert_eq!(after_yes, ConversationState::Idle);
        assert_eq!(action, Action::ResetDone);
    }

    #[test]
    fn test_reset_while_confirming_keeps_original_previous() {
        let state = confirming(
            ConfirmPurpose::SwitchAutomation {
                automation_id: ID_B.to_string(),
            },
            chatting(ID_A),
        );
        let (next, _) = transition(state, Input::Menu(MenuItem::Reset));
        assert_eq!(
            next,
            confirming(ConfirmPurpose::ResetConversation, chatting(ID_A))
        );
    }

    #[test]
    fn test_unrelated_input_repeats_confirmation() {
        let state = confirming(ConfirmPurpose::ResetConversation, chatting(ID_A));
        let (next, action) = transition(state.clone(), Input::FreeText("hmm".into()));
        assert_eq!(next, state);
        assert_eq!(
            action,
            Action::AskConfirmation(ConfirmPurpose::ResetConversation)
        );
    }

    #[test]
    fn test_stale_confirmation_is_ignored() {
        for state in [ConversationState::Idle, chatting(ID_A)] {
            let (next, action) = transition(state.clone(), Input::Confirm(true));
            assert_eq!(next, state);
            assert_eq!(action, Action::Stale);
        }
    }

    #[test]
    fn test_free_text_by_state() {
        let (next, action) = transition(ConversationState::Idle, Input::FreeText("hi".into()));
        assert_eq!(next, ConversationState::Idle);
        assert_eq!(
            action,
            Action::Answer {
                automation_id: None,
                question: "hi".into()
            }
        );

        let (next, action) = transition(
            ConversationState::AwaitingAutomationId,
            Input::FreeText("my swap bot".into()),
        );
        assert_eq!(next, ConversationState::AwaitingAutomationId);
        assert_eq!(action, Action::InvalidId);

        let (next, action) = transition(chatting(ID_A), Input::FreeText("why?".into()));
        assert_eq!(next, chatting(ID_A));
        assert_eq!(
            action,
            Action::Answer {
                automation_id: Some(ID_A.to_string()),
                question: "why?".into()
            }
        );
    }
}
