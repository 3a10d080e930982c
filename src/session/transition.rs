//! Pure state transition function
//!
//! Given the same state and event this always produces the same new state
//! and effects. All I/O happens in the runtime that executes the effects.

use super::{ChatMessage, Effect, Event, MarketRef, MessageOutcome, SessionPhase, SessionState};
use crate::client::SubmitMarket;
use thiserror::Error;

pub const CONNECT_ERROR: &str = "Failed to connect to API";
pub const LOCKED_ERROR: &str = "Session is processing. Please wait...";
pub const SEND_ERROR: &str = "Failed to send message";
pub const SUBMIT_ERROR: &str = "Failed to submit market";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Reasons an event is rejected. A rejected event leaves the state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A message is already being sent")]
    SendInFlight,
    #[error("No market to submit")]
    NoMarket,
    #[error("Event belongs to superseded session {0}")]
    StaleSession(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
#[allow(clippy::too_many_lines)]
pub fn transition(state: &SessionState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state.phase, event) {
        // ============================================================
        // Connectivity
        // ============================================================
        (_, Event::InitSucceeded { session_id }) => {
            ensure_current(state, &session_id)?;
            let mut next = state.clone();
            next.connected = true;
            Ok(TransitionResult::new(next))
        }

        (_, Event::InitFailed { session_id }) => {
            ensure_current(state, &session_id)?;
            let mut next = state.clone();
            next.connected = false;
            next.last_error = Some(CONNECT_ERROR.to_string());
            Ok(TransitionResult::new(next))
        }

        (_, Event::HealthChecked { healthy }) => {
            let mut next = state.clone();
            next.connected = healthy;
            Ok(TransitionResult::new(next))
        }

        // ============================================================
        // Messaging
        // ============================================================

        // Blank input is ignored whatever the phase
        (_, Event::UserMessage { text, .. }) if text.trim().is_empty() => {
            Err(TransitionError::EmptyMessage)
        }

        // Exactly one send may be outstanding
        (SessionPhase::Sending { .. }, Event::UserMessage { .. }) => {
            Err(TransitionError::SendInFlight)
        }

        // Idle + UserMessage -> Sending, message appended optimistically
        (SessionPhase::Idle, Event::UserMessage { text, at }) => {
            let text = text.trim();
            let mut next = state.clone();
            next.last_error = None;
            let id = next.next_id();
            next.messages.push(ChatMessage::user(id, text, at));
            next.phase = SessionPhase::Sending {
                pending_message_id: id,
            };
            let effect = Effect::send_message(&next.session_id, text);
            Ok(TransitionResult::new(next).with_effect(effect))
        }

        // Sending + Busy -> Idle, user message rolled back
        (
            SessionPhase::Sending { pending_message_id },
            Event::ReplyReceived {
                session_id,
                outcome: MessageOutcome::Busy,
                ..
            },
        ) => {
            ensure_current(state, &session_id)?;
            let mut next = state.clone();
            next.rollback(pending_message_id);
            next.locked = true;
            next.last_error = Some(LOCKED_ERROR.to_string());
            next.phase = SessionPhase::Idle;
            Ok(TransitionResult::new(next))
        }

        // Sending + Reply -> Idle, assistant message appended
        (
            SessionPhase::Sending { .. },
            Event::ReplyReceived {
                session_id,
                outcome:
                    MessageOutcome::Reply {
                        content,
                        has_market,
                        market_id,
                        eval_summary,
                    },
                at,
            },
        ) => {
            ensure_current(state, &session_id)?;
            let mut next = state.clone();
            next.locked = false;

            if has_market {
                if let Some(id) = &market_id {
                    next.current_market = Some(MarketRef {
                        id: id.clone(),
                        eval_summary: eval_summary.clone(),
                    });
                }
            }

            let id = next.next_id();
            let mut reply = ChatMessage::assistant(id, content, at);
            reply.has_market = has_market;
            reply.market_id = market_id;
            reply.eval_summary = eval_summary;
            next.messages.push(reply);
            next.phase = SessionPhase::Idle;
            Ok(TransitionResult::new(next))
        }

        // Sending + SendFailed -> Idle, rollback before the error is recorded
        (
            SessionPhase::Sending { pending_message_id },
            Event::SendFailed {
                session_id,
                message,
            },
        ) => {
            ensure_current(state, &session_id)?;
            let mut next = state.clone();
            next.rollback(pending_message_id);
            next.last_error = Some(if message.trim().is_empty() {
                SEND_ERROR.to_string()
            } else {
                message
            });
            next.phase = SessionPhase::Idle;
            Ok(TransitionResult::new(next))
        }

        // ============================================================
        // Market submission
        // ============================================================
        (_, Event::SubmitRequested { user_id, link }) => {
            let market = state.current_market.as_ref().ok_or(TransitionError::NoMarket)?;
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::SubmitMarket {
                market_id: market.id.clone(),
                request: SubmitMarket {
                    session_id: state.session_id.clone(),
                    user_id,
                    link,
                },
            }))
        }

        (
            _,
            Event::MarketSubmitted {
                session_id,
                market_id,
                response,
                at,
            },
        ) => {
            ensure_current(state, &session_id)?;
            let mut next = state.clone();
            let content = match &response.notion_url {
                Some(url) => format!("Market submitted successfully! View it here: {url}"),
                None => "Market submitted successfully!".to_string(),
            };
            let id = next.next_id();
            let mut notice = ChatMessage::system(id, content, at);
            notice.notion_url = response.notion_url;
            next.messages.push(notice);

            // A newer market may have arrived while this one was being submitted
            if next.current_market.as_ref().is_some_and(|m| m.id == market_id) {
                next.current_market = None;
            }
            Ok(TransitionResult::new(next))
        }

        (_, Event::SubmitFailed { session_id }) => {
            ensure_current(state, &session_id)?;
            let mut next = state.clone();
            next.last_error = Some(SUBMIT_ERROR.to_string());
            Ok(TransitionResult::new(next))
        }

        // ============================================================
        // Lifecycle
        // ============================================================
        (phase, Event::NewSession { session_id }) => {
            let next = SessionState::new(session_id);
            let create = Effect::create_session(&next.session_id);
            let mut result = TransitionResult::new(next);
            if matches!(phase, SessionPhase::Sending { .. }) {
                result = result.with_effect(Effect::CancelSend);
            }
            Ok(result.with_effect(create))
        }

        (_, Event::ClearError) => {
            let mut next = state.clone();
            next.last_error = None;
            Ok(TransitionResult::new(next))
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (phase, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {phase:?} with event {event:?}"
        ))),
    }
}

/// Outcomes addressed to a superseded session must not touch the current one
fn ensure_current(state: &SessionState, session_id: &str) -> Result<(), TransitionError> {
    if state.session_id == session_id {
        Ok(())
    } else {
        Err(TransitionError::StaleSession(session_id.to_string()))
    }
}
