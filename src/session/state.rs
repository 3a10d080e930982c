//! Session state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// A single entry in the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub has_market: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_summary: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notion_url: Option<String>,
}

impl ChatMessage {
    fn plain(
        id: u64,
        role: MessageRole,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            timestamp,
            has_market: false,
            market_id: None,
            eval_summary: None,
            notion_url: None,
        }
    }

    pub fn user(id: u64, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::plain(id, MessageRole::User, content, timestamp)
    }

    pub fn assistant(id: u64, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::plain(id, MessageRole::Assistant, content, timestamp)
    }

    pub fn system(id: u64, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::plain(id, MessageRole::System, content, timestamp)
    }
}

/// The most recent market produced by the backend, awaiting submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRef {
    pub id: String,
    #[serde(default)]
    pub eval_summary: Option<Value>,
}

/// Whether a send is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionPhase {
    /// Ready for user input
    #[default]
    Idle,
    /// A message is on the wire; `pending_message_id` is its optimistic entry
    Sending { pending_message_id: u64 },
}

/// Complete client-side state of one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    pub phase: SessionPhase,
    /// Backend reported it is still busy with an earlier message
    pub locked: bool,
    pub current_market: Option<MarketRef>,
    /// Last known reachability of the backend
    pub connected: bool,
    pub last_error: Option<String>,
    next_message_id: u64,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            phase: SessionPhase::Idle,
            locked: false,
            current_market: None,
            connected: true,
            last_error: None,
            next_message_id: 1,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, SessionPhase::Sending { .. })
    }

    pub fn has_messages(&self) -> bool {
        !self.messages.is_empty()
    }

    /// Allocate the next message id; ids are never reused within a session
    pub(super) fn next_id(&mut self) -> u64 {
        let id = self.next_message_id;
        self.next_message_id += 1;
        id
    }

    /// Remove an optimistic message that the backend did not accept
    pub(super) fn rollback(&mut self, message_id: u64) {
        self.messages.retain(|m| m.id != message_id);
    }
}
