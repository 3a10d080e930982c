//! Effects produced by state transitions

use crate::client::SubmitMarket;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Register the session with the backend
    CreateSession { session_id: String },

    /// Put a user message on the wire
    SendMessage { session_id: String, text: String },

    /// Submit the current market
    SubmitMarket {
        market_id: String,
        request: SubmitMarket,
    },

    /// Abort the outstanding send, if any
    CancelSend,
}

impl Effect {
    pub fn send_message(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Effect::SendMessage {
            session_id: session_id.into(),
            text: text.into(),
        }
    }

    pub fn create_session(session_id: impl Into<String>) -> Self {
        Effect::CreateSession {
            session_id: session_id.into(),
        }
    }
}
