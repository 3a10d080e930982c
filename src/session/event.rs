//! Events that drive the session state machine

use crate::client::{MessageReply, SubmitResponse};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Backend status value signalling that an earlier message is still being processed
pub const LOCKED_STATUS: &str = "locked";

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Connectivity
    InitSucceeded {
        session_id: String,
    },
    InitFailed {
        session_id: String,
    },
    HealthChecked {
        healthy: bool,
    },

    // Messaging
    UserMessage {
        text: String,
        at: DateTime<Utc>,
    },
    ReplyReceived {
        session_id: String,
        outcome: MessageOutcome,
        at: DateTime<Utc>,
    },
    SendFailed {
        session_id: String,
        message: String,
    },

    // Market submission
    SubmitRequested {
        user_id: String,
        link: String,
    },
    MarketSubmitted {
        session_id: String,
        market_id: String,
        response: SubmitResponse,
        at: DateTime<Utc>,
    },
    SubmitFailed {
        session_id: String,
    },

    // Lifecycle
    NewSession {
        session_id: String,
    },
    ClearError,
}

/// What a successful message round-trip means for the session.
///
/// A busy backend is an expected outcome, not a transport failure, so it
/// lives next to the normal reply rather than in the error channel.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// Backend is still processing an earlier message for this session
    Busy,
    Reply {
        content: String,
        has_market: bool,
        market_id: Option<String>,
        eval_summary: Option<Value>,
    },
}

impl MessageOutcome {
    pub fn is_busy(&self) -> bool {
        matches!(self, MessageOutcome::Busy)
    }
}

impl From<MessageReply> for MessageOutcome {
    fn from(reply: MessageReply) -> Self {
        if reply.status.as_deref() == Some(LOCKED_STATUS) {
            return MessageOutcome::Busy;
        }
        MessageOutcome::Reply {
            content: reply.response.unwrap_or_default(),
            has_market: reply.has_market.unwrap_or(false),
            market_id: reply.market_id,
            eval_summary: reply.eval_summary,
        }
    }
}
