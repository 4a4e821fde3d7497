//! Shared state for the Telegram bot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use flowdoctor_core::config::DEFAULT_SESSION_TTL;
use flowdoctor_core::{Assistant, AutomationSource, ChatMessage};
use flowdoctor_models::AutomationRecord;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::conversation::{classify, transition, Action, ConversationState, Input};
use crate::session::Session;

/// Executions the bot looks at per automation, newest first.
pub const RECENT_EXECUTION_LIMIT: usize = 10;

/// Shared state for the Telegram bot, accessible across all handlers.
pub struct BotState {
    /// Active sessions (chat_id -> session).
    sessions: RwLock<HashMap<i64, Session>>,
    /// Where automations are fetched from.
    source: Arc<dyn AutomationSource>,
    /// Conversational explanations.
    assistant: Arc<Assistant>,
    /// Idle time before a session is evicted.
    session_ttl: Duration,
}

impl BotState {
    pub fn new(source: Arc<dyn AutomationSource>, assistant: Assistant) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            source,
            assistant: Arc::new(assistant),
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn source(&self) -> &Arc<dyn AutomationSource> {
        &self.source
    }

    pub fn assistant(&self) -> &Assistant {
        &self.assistant
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Fetch an automation with its history cut to the most recent runs.
    pub async fn fetch_recent(&self, automation_id: &str) -> Option<AutomationRecord> {
        let mut automation = self.source.automation(automation_id).await?;
        automation.executions.truncate(RECENT_EXECUTION_LIMIT);
        Some(automation)
    }

    /// Current conversation state of a chat.
    pub async fn conversation(&self, chat_id: i64) -> ConversationState {
        let sessions = self.sessions.read().await;
        sessions
            .get(&chat_id)
            .map(|s| s.conversation.clone())
            .unwrap_or_default()
    }

    /// Classify free text against the chat's state and run the transition.
    ///
    /// Both steps happen under one write lock.
    pub async fn apply_text(&self, chat_id: i64, text: &str) -> Action {
        self.step(chat_id, |state| classify(text, state)).await
    }

    /// Run one transition for a chat and store the new state.
    ///
    /// History is dropped when the focused automation changes.
    pub async fn apply(&self, chat_id: i64, input: Input) -> Action {
        self.step(chat_id, |_| input).await
    }

    async fn step<F>(&self, chat_id: i64, input: F) -> Action
    where
        F: FnOnce(&ConversationState) -> Input,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(chat_id).or_default();
        session.touch();

        let current = std::mem::take(&mut session.conversation);
        let before = current.automation_id().map(str::to_string);
        let input = input(&current);
        debug!(chat_id = chat_id, input = ?input, "Classified input");
        let (next, action) = transition(current, input);

        if next.automation_id() != before.as_deref() || action == Action::ResetDone {
            session.clear_history();
        }

        debug!(
            chat_id = chat_id,
            state = next.describe(),
            action = ?action,
            "Conversation transition"
        );
        session.conversation = next;
        action
    }

    /// Record a question and its reply in the chat history.
    pub async fn record_exchange(&self, chat_id: i64, question: &str, reply: &str) {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(chat_id)
            .or_default()
            .push_exchange(question, reply);
    }

    /// Chat history for assistant context.
    pub async fn history(&self, chat_id: i64) -> Vec<ChatMessage> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&chat_id)
            .map(Session::history)
            .unwrap_or_default()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than the TTL. Returns how many.
    pub async fn evict_idle(&self) -> usize {
        let ttl = self.session_ttl;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_idle(ttl));
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }
}

/// Create a shared BotState wrapped in Arc.
pub fn create_shared_state(
    source: Arc<dyn AutomationSource>,
    assistant: Assistant,
    session_ttl: Duration,
) -> Arc<BotState> {
    Arc::new(BotState::new(source, assistant).with_session_ttl(session_ttl))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use flowdoctor_models::{AutomationBuilder, ExecutionBuilder};

    use super::*;
    use crate::conversation::{ConfirmPurpose, MenuItem};

    const ID_A: &str = "cmkwhwr4j0001jp0412bdp8zw";
    const ID_B: &str = "clq9z8y7x6w5v4u3t2s1r0qpo";

    struct EmptySource;

    #[async_trait]
    impl AutomationSource for EmptySource {
        async fn automation(&self, _id: &str) -> Option<AutomationRecord> {
            None
        }
    }

    struct LongHistorySource;

    #[async_trait]
    impl AutomationSource for LongHistorySource {
        async fn automation(&self, id: &str) -> Option<AutomationRecord> {
            let mut builder = AutomationBuilder::new(id);
            for i in 0..15 {
                let run = ExecutionBuilder::new("SUCCESS").started_at(i.to_string());
                builder = builder.execution(run.build());
            }
            Some(builder.build())
        }
    }

    fn make_state() -> BotState {
        BotState::new(Arc::new(EmptySource), Assistant::disabled())
    }

    #[tokio::test]
    async fn test_unknown_chat_is_idle() {
        let state = make_state();
        assert_eq!(state.conversation(1).await, ConversationState::Idle);
        assert_eq!(state.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_apply_stores_state_per_chat() {
        let state = make_state();

        let action = state.apply_text(1, ID_A).await;
        assert_eq!(
            action,
            Action::Diagnose {
                automation_id: ID_A.to_string()
            }
        );
        assert_eq!(state.conversation(1).await.automation_id(), Some(ID_A));
        assert_eq!(state.conversation(2).await, ConversationState::Idle);
    }

    #[tokio::test]
    async fn test_confirmation_round_trip() {
        let state = make_state();
        state.apply(1, Input::AutomationRef(ID_A.to_string())).await;

        let action = state.apply_text(1, ID_B).await;
        assert_eq!(
            action,
            Action::AskConfirmation(ConfirmPurpose::SwitchAutomation {
                automation_id: ID_B.to_string()
            })
        );

        let action = state.apply_text(1, "yes").await;
        assert_eq!(
            action,
            Action::Diagnose {
                automation_id: ID_B.to_string()
            }
        );
        assert_eq!(state.conversation(1).await.automation_id(), Some(ID_B));
    }

    #[tokio::test]
    async fn test_concurrent_confirmations_see_fresh_state() {
        let state = Arc::new(make_state());
        state.apply(1, Input::AutomationRef(ID_A.to_string())).await;
        state.apply(1, Input::Menu(MenuItem::Reset)).await;

        let (a, b) = tokio::join!(state.apply_text(1, "yes"), state.apply_text(1, "yes"));
        let mut actions = [a, b];
        actions.sort_by_key(|a| matches!(a, Action::ResetDone));
        assert!(matches!(actions[1], Action::ResetDone));
        // The second "yes" lands on an idle chat, not a stale confirmation
        assert!(!matches!(actions[0], Action::ResetDone | Action::Stale));
        assert_eq!(state.conversation(1).await, ConversationState::Idle);
    }

    #[tokio::test]
    async fn test_fetch_recent_caps_history() {
        let state = BotState::new(Arc::new(LongHistorySource), Assistant::disabled());
        let automation = state.fetch_recent(ID_A).await.unwrap();
        assert_eq!(automation.executions.len(), RECENT_EXECUTION_LIMIT);
        assert_eq!(automation.executions[0].started_at.as_deref(), Some("0"));

        let full = state.source().automation(ID_A).await.unwrap();
        assert_eq!(full.executions.len(), 15);

        assert!(make_state().fetch_recent(ID_A).await.is_none());
    }

    #[tokio::test]
    async fn test_history_dropped_on_switch_and_reset() {
        let state = make_state();
        state.apply(1, Input::AutomationRef(ID_A.to_string())).await;
        state.record_exchange(1, "why?", "slippage").await;
        assert_eq!(state.history(1).await.len(), 2);

        // Pending confirmation keeps the history
        state.apply(1, Input::Menu(MenuItem::Reset)).await;
        assert_eq!(state.history(1).await.len(), 2);

        // Cancelling keeps it too
        state.apply(1, Input::Confirm(false)).await;
        assert_eq!(state.history(1).await.len(), 2);

        state.apply(1, Input::Menu(MenuItem::Reset)).await;
        let action = state.apply(1, Input::Confirm(true)).await;
        assert_eq!(action, Action::ResetDone);
        assert!(state.history(1).await.is_empty());
    }

    #[tokio::test]
    async fn test_evict_idle_sessions() {
        let state = make_state().with_session_ttl(Duration::from_millis(10));
        state.apply(1, Input::Menu(MenuItem::Help)).await;
        state.apply(2, Input::Menu(MenuItem::Help)).await;
        assert_eq!(state.session_count().await, 2);

        tokio::time::sleep(Duration::from_millis(30)).await;
        state.apply(2, Input::Menu(MenuItem::Help)).await;

        assert_eq!(state.evict_idle().await, 1);
        assert_eq!(state.session_count().await, 1);
        assert_eq!(state.conversation(1).await, ConversationState::Idle);
    }
}
