//! Conversation message store
//!
//! Ordered, append-only log of conversation turns. System messages live only
//! in memory; everything else is what gets persisted as history.

use tracing::warn;

use crate::core::Message;

/// Manages conversation history
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the end of the log
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All messages in append order
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Non-system messages in append order
    pub fn history(&self) -> Vec<&Message> {
        self.messages.iter().filter(|m| !m.is_system()).collect()
    }

    /// Extend the log with previously persisted messages
    ///
    /// Input that is not an array of messages is ignored with a warning, and
    /// the conversation continues with what it already has.
    pub fn load(&mut self, serialized: serde_json::Value) -> usize {
        if !serialized.is_array() {
            warn!("Ignoring history: expected a JSON array of messages");
            return 0;
        }

        match serde_json::from_value::<Vec<Message>>(serialized) {
            Ok(loaded) => {
                let count = loaded.len();
                self.messages.extend(loaded);
                count
            }
            Err(e) => {
                warn!(error = %e, "Ignoring malformed history");
                0
            }
        }
    }

    /// Load from serialized JSON text
    pub fn load_str(&mut self, serialized: &str) -> usize {
        match serde_json::from_str::<serde_json::Value>(serialized) {
            Ok(value) => self.load(value),
            Err(e) => {
                warn!(error = %e, "Ignoring unparsable history");
                0
            }
        }
    }

    /// Messages in prompt order: system messages first, then the rest
    /// chronologically
    pub fn snapshot(&self) -> Vec<Message> {
        let (system, rest): (Vec<&Message>, Vec<&Message>) =
            self.messages.iter().partition(|m| m.is_system());
        system.into_iter().chain(rest).cloned().collect()
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
    use crate::core::{ContentPart, Role, ToolCallRequest};
    use serde_json::json;

    #[test]
    fn test_append_and_history() {
        let mut conv = Conversation::new();
        conv.append(Message::system("You are helpful"));
        conv.append(Message::user("Hello"));
        conv.append(Message::assistant("Hi there!"));

        assert_eq!(conv.len(), 3);
        let history = conv.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role(), Role::User);
    }

    #[test]
    fn test_snapshot_puts_system_first() {
        let mut conv = Conversation::new();
        conv.append(Message::user("earlier question"));
        conv.append(Message::assistant("earlier answer"));
        conv.append(Message::system("instructions"));
        conv.append(Message::user("now"));

        let roles: Vec<Role> = conv.snapshot().iter().map(Message::role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        // the log itself keeps append order
        assert_eq!(conv.all()[2].role(), Role::System);
    }

    #[test]
    fn test_load_extends() {
        let mut conv = Conversation::new();
        conv.append(Message::system("sys"));

        let saved = vec![
            Message::user("q"),
            Message::tool_calls(vec![ToolCallRequest::new("c1", "readFile", json!({"file": "a"}))]),
            Message::tool_result("c1", "readFile", vec![ContentPart::text("body")]),
            Message::assistant("a"),
        ];
        let loaded = conv.load(serde_json::to_value(&saved).unwrap());

        assert_eq!(loaded, 4);
        assert_eq!(conv.len(), 5);
        assert_eq!(conv.all()[1..], saved[..]);
    }

    #[test]
    fn test_load_malformed_is_ignored() {
        let mut conv = Conversation::new();
        conv.append(Message::user("keep me"));

        assert_eq!(conv.load(json!({"role": "user"})), 0);
        assert_eq!(conv.load(json!([{"role": "wizard"}])), 0);
        assert_eq!(conv.load_str("not json"), 0);
        assert_eq!(conv.len(), 1);
    }
}
