//! Session runtime: applies events and executes effects

use super::{
    generate_session_id, transition, Effect, Event, MessageOutcome, SessionState, TransitionError,
};
use crate::client::{ApiError, MarketApi, SessionMetadata, SubmitResponse};
use chrono::Utc;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Outcome of [`ChatSession::send_message`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// Nothing was sent: blank input or a send already outstanding
    Skipped,
    /// The backend answered and the reply was appended
    Replied,
    /// The backend is still busy with an earlier message
    Locked,
    /// The send failed; the error is in `last_error`
    Failed,
    /// A newer session replaced this one before the outcome arrived
    Discarded,
}

/// Errors surfaced to callers of the session runtime
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to submit market: {0}")]
    Submit(#[from] ApiError),
}

struct Inner {
    state: SessionState,
    /// Cancels the outstanding send, if any
    send_cancel: Option<CancellationToken>,
}

/// What applying an event yielded
struct Applied {
    effects: Vec<Effect>,
    send_cancel: Option<CancellationToken>,
}

/// One conversation with the market backend.
///
/// Each instance owns its own state; any number may coexist. The state
/// lock is only held while applying an event, never across a network
/// call, so the one-send-at-a-time guard is decided before the first
/// suspension point.
pub struct ChatSession<A: MarketApi> {
    api: A,
    /// Link reported with market submissions
    link: String,
    inner: Mutex<Inner>,
    snapshots: watch::Sender<SessionState>,
}

impl<A: MarketApi> ChatSession<A> {
    /// Start a conversation with a freshly generated session id
    pub fn new(api: A, link: impl Into<String>) -> Self {
        Self::with_session_id(api, link, generate_session_id())
    }

    pub fn with_session_id(
        api: A,
        link: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        let state = SessionState::new(session_id);
        let (snapshots, _) = watch::channel(state.clone());
        Self {
            api,
            link: link.into(),
            inner: Mutex::new(Inner {
                state,
                send_cancel: None,
            }),
            snapshots,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn session_id(&self) -> String {
        self.lock().state.session_id.clone()
    }

    /// Current state
    pub fn snapshot(&self) -> SessionState {
        self.lock().state.clone()
    }

    /// Observe every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.snapshots.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one transition and update the send token bookkeeping
    fn apply(&self, event: Event) -> Result<Applied, TransitionError> {
        let mut inner = self.lock();
        let result = transition(&inner.state, event)?;

        let mut send_cancel = None;
        for effect in &result.effects {
            match effect {
                Effect::CancelSend => {
                    if let Some(token) = inner.send_cancel.take() {
                        token.cancel();
                    }
                }
                Effect::SendMessage { .. } => {
                    let token = CancellationToken::new();
                    inner.send_cancel = Some(token.clone());
                    send_cancel = Some(token);
                }
                Effect::CreateSession { .. } | Effect::SubmitMarket { .. } => {}
            }
        }
        if !result.new_state.is_loading() {
            inner.send_cancel = None;
        }

        inner.state = result.new_state;
        let snapshot = inner.state.clone();
        drop(inner);

        self.snapshots.send_replace(snapshot);
        Ok(Applied {
            effects: result.effects,
            send_cancel,
        })
    }

    /// Apply an event whose rejection only needs logging
    fn apply_logged(&self, event: Event) {
        if let Err(e) = self.apply(event) {
            tracing::debug!(error = %e, "Event ignored");
        }
    }

    /// Register the current session with the backend.
    ///
    /// Failure marks the session disconnected but does not block sending.
    /// Returns the resulting connectivity.
    pub async fn init_session(&self) -> bool {
        let session_id = self.session_id();
        self.create_remote_session(session_id).await
    }

    async fn create_remote_session(&self, session_id: String) -> bool {
        let metadata = SessionMetadata::web_ui(Utc::now()).to_value();
        match self.api.create_session(&session_id, &metadata).await {
            Ok(_) => {
                tracing::info!(session_id = %session_id, "Session created");
                self.apply_logged(Event::InitSucceeded { session_id });
                true
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Failed to create session");
                self.apply_logged(Event::InitFailed { session_id });
                false
            }
        }
    }

    /// Send a user message and wait for the backend's answer.
    ///
    /// Blank input, or a call made while another send is outstanding, is a
    /// no-op. Failures are recorded in `last_error` rather than returned.
    pub async fn send_message(&self, content: &str) -> SendStatus {
        let applied = match self.apply(Event::UserMessage {
            text: content.to_string(),
            at: Utc::now(),
        }) {
            Ok(applied) => applied,
            Err(e) => {
                tracing::debug!(error = %e, "Message not sent");
                return SendStatus::Skipped;
            }
        };

        let send = applied.effects.into_iter().find_map(|effect| match effect {
            Effect::SendMessage { session_id, text } => Some((session_id, text)),
            _ => None,
        });
        let Some((session_id, text)) = send else {
            return SendStatus::Skipped;
        };
        let cancel = applied.send_cancel.unwrap_or_default();

        let mut guard = PendingSend {
            session: self,
            session_id: Some(session_id.clone()),
        };

        let result = self.api.send_message(&session_id, &text, cancel).await;
        guard.disarm();

        let (event, status) = match result {
            Ok(reply) => {
                let outcome = MessageOutcome::from(reply);
                let status = if outcome.is_busy() {
                    SendStatus::Locked
                } else {
                    SendStatus::Replied
                };
                (
                    Event::ReplyReceived {
                        session_id,
                        outcome,
                        at: Utc::now(),
                    },
                    status,
                )
            }
            Err(e) => (
                Event::SendFailed {
                    session_id,
                    message: e.message,
                },
                SendStatus::Failed,
            ),
        };

        match self.apply(event) {
            Ok(_) => status,
            Err(e) => {
                tracing::info!(error = %e, "Discarding send outcome");
                SendStatus::Discarded
            }
        }
    }

    /// Submit the current market.
    ///
    /// Returns `Ok(None)` when there is nothing to submit. Unlike send
    /// failures, a submission failure is returned to the caller after being
    /// recorded in `last_error`, so the market stays available for retry.
    pub async fn submit_market(
        &self,
        user_id: &str,
    ) -> Result<Option<SubmitResponse>, SessionError> {
        let applied = match self.apply(Event::SubmitRequested {
            user_id: user_id.to_string(),
            link: self.link.clone(),
        }) {
            Ok(applied) => applied,
            Err(e) => {
                tracing::debug!(error = %e, "Nothing to submit");
                return Ok(None);
            }
        };

        let submit = applied.effects.into_iter().find_map(|effect| match effect {
            Effect::SubmitMarket { market_id, request } => Some((market_id, request)),
            _ => None,
        });
        let Some((market_id, request)) = submit else {
            return Ok(None);
        };

        match self.api.submit_market(&market_id, &request).await {
            Ok(response) => {
                tracing::info!(
                    market_id = %market_id,
                    notion_url = ?response.notion_url,
                    "Market submitted"
                );
                self.apply_logged(Event::MarketSubmitted {
                    session_id: request.session_id,
                    market_id,
                    response: response.clone(),
                    at: Utc::now(),
                });
                Ok(Some(response))
            }
            Err(e) => {
                tracing::error!(market_id = %market_id, error = %e, "Market submission failed");
                self.apply_logged(Event::SubmitFailed {
                    session_id: request.session_id,
                });
                Err(SessionError::Submit(e))
            }
        }
    }

    /// Replace this conversation with a fresh one.
    ///
    /// The reset is applied before returning: an outstanding send for the
    /// old session is cancelled and its outcome discarded. Registering the
    /// new session is left to [`init_session`](Self::init_session), which
    /// the caller may await or spawn. Returns the new session id.
    pub fn new_session(&self) -> String {
        let session_id = generate_session_id();
        match self.apply(Event::NewSession {
            session_id: session_id.clone(),
        }) {
            Ok(applied) => {
                let cancelled = applied.effects.contains(&Effect::CancelSend);
                tracing::info!(session_id = %session_id, cancelled, "Started new session");
                session_id
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reset session");
                self.session_id()
            }
        }
    }

    pub fn clear_error(&self) {
        self.apply_logged(Event::ClearError);
    }

    /// Fetch the backend's view of the current session
    pub async fn get_session(&self) -> Result<Option<Value>, ApiError> {
        let session_id = self.session_id();
        self.api.get_session(&session_id).await
    }

    /// Probe the backend and record the result as connectivity
    pub async fn check_health(&self) -> bool {
        let healthy = self.api.check_health().await;
        self.apply_logged(Event::HealthChecked { healthy });
        healthy
    }
}

/// Returns the session to idle if a send is abandoned mid-flight
struct PendingSend<'a, A: MarketApi> {
    session: &'a ChatSession<A>,
    /// `Some` until the send produced an outcome
    session_id: Option<String>,
}

impl<A: MarketApi> PendingSend<'_, A> {
    fn disarm(&mut self) {
        self.session_id = None;
    }
}

impl<A: MarketApi> Drop for PendingSend<'_, A> {
    fn drop(&mut self) {
        if let Some(session_id) = self.session_id.take() {
            tracing::warn!(session_id = %session_id, "Send abandoned before completion");
            self.session.apply_logged(Event::SendFailed {
                session_id,
                message: ApiError::cancelled().message,
            });
        }
    }
}
