//! Conversation context management
//!
//! Each agent owns its own message list for the lifetime of one request.
//! Sub-agents start from a fresh list seeded by the delegation.

use crate::core::{Message, Role};

/// Ordered message context sent to the model
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation starting with a system prompt
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut conv = Self::new();
        conv.add_system(prompt);
        conv
    }

    /// Add a system message
    pub fn add_system(&mut self, content: impl Into<String>) {
        self.messages.push(Message::system(content));
    }

    /// Add a user message
    pub fn add_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Add an assistant message
    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Append prior client turns, skipping system turns and empty content
    pub fn extend_history(&mut self, history: impl IntoIterator<Item = Message>) {
        self.messages.extend(
            history
                .into_iter()
                .filter(|m| m.role != Role::System && !m.content.trim().is_empty()),
        );
    }

    /// Append prior client turns of every role, skipping empty content
    pub fn extend_turns(&mut self, history: impl IntoIterator<Item = Message>) {
        self.messages
            .extend(history.into_iter().filter(|m| !m.content.trim().is_empty()));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last user message
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    /// Get message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_basic() {
        let mut conv = Conversation::with_system_prompt("You are an editor");
        conv.add_user("Hello");
        conv.add_assistant("Hi there!");

        assert_eq!(conv.len(), 3);
        assert_eq!(conv.messages()[0].role, Role::System);
        assert_eq!(conv.last_user_message().unwrap().content, "Hello");
    }

    #[test]
    fn test_history_drops_system_and_empty_turns() {
        let mut conv = Conversation::new();
        conv.extend_history(vec![
            Message::system("injected by the UI"),
            Message::user("write chapter 1"),
            Message::assistant("  "),
            Message::assistant("Sure"),
        ]);

        let roles: Vec<Role> = conv.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[test]
    fn test_turns_keep_system_messages() {
        let mut conv = Conversation::with_system_prompt("You are a muse");
        conv.extend_turns(vec![
            Message::system("Tone: noir"),
            Message::user("write chapter 1"),
            Message::assistant(""),
        ]);

        let roles: Vec<Role> = conv.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::System, Role::User]);
        assert_eq!(conv.messages()[1].content, "Tone: noir");
    }
}
