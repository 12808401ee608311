//! Conversation transcript types.
//!
//! The transcript is append-only: messages are never edited or removed, and
//! insertion order is the only ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// First message of every session.
pub const GREETING: &str = "Hello! I'm a SQL assistant. Ask me anything about your database.";

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking questions.
    Human,
    /// The chatbot.
    Assistant,
}

impl Role {
    /// Returns the label used in transcripts and prompt history.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "Human",
            Self::Assistant => "AI",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: Role,
    /// The content of the message.
    pub content: String,
}

impl Message {
    /// Creates a new message with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a human message.
    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.role, self.content)
    }
}

/// An ordered, append-only sequence of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates a new empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a conversation that opens with the assistant's greeting.
    pub fn with_greeting() -> Self {
        let mut conversation = Self::new();
        conversation.append(Message::assistant(GREETING));
        conversation
    }

    /// Adds a message at the end.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Returns all messages in insertion order.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the `n` most recent messages.
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Renders the `n` most recent messages as prompt history, one per line.
    pub fn format_history(&self, n: usize) -> String {
        self.recent(n)
            .iter()
            .map(Message::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns the number of messages in the conversation.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the conversation has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
