//! Per-chat session state.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use flowdoctor_core::ChatMessage;

use crate::conversation::ConversationState;

/// Chat messages kept per session for assistant context.
pub const HISTORY_LIMIT: usize = 12;

/// A chat's conversation with the bot.
#[derive(Debug, Clone)]
pub struct Session {
    /// Where the conversation currently is.
    pub conversation: ConversationState,
    /// Recent exchanges, oldest first.
    history: VecDeque<ChatMessage>,
    /// When the user last interacted (for idle eviction).
    pub last_active: Instant,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            conversation: ConversationState::Idle,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            last_active: Instant::now(),
        }
    }

    /// Mark the session as active now.
    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    /// Check if the session has been idle longer than `ttl`.
    pub fn is_idle(&self, ttl: Duration) -> bool {
        self.last_active.elapsed() > ttl
    }

    /// Record a question and the reply it got.
    pub fn push_exchange(&mut self, question: &str, reply: &str) {
        self.history.push_back(ChatMessage::user(question));
        self.history.push_back(ChatMessage::assistant(reply));
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.history.iter().cloned().collect()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use flowdoctor_core::ChatRole;

    use super::*;

    #[test]
    fn test_new_session() {
        let session = Session::new();
        assert_eq!(session.conversation, ConversationState::Idle);
        assert!(session.history().is_empty());
        assert!(!session.is_idle(Duration::from_secs(60)));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut session = Session::new();
        for i in 0..10 {
            session.push_exchange(&format!("q{i}"), &format!("a{i}"));
        }

        let history = session.history();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0], ChatMessage::user("q4"));
        assert_eq!(history.last().unwrap().role, ChatRole::Assistant);
        assert_eq!(history.last().unwrap().content, "a9");

        session.clear_history();
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_idle_detection() {
        let mut session = Session::new();
        std::thread::sleep(Duration::from_millis(20));
        assert!(session.is_idle(Duration::from_millis(5)));

        session.touch();
        assert!(!session.is_idle(Duration::from_secs(60)));
    }
}
