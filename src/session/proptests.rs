//! Property-based tests for the session state machine
//!
//! Random action sequences are driven through [`transition`] and the
//! structural invariants are checked after every step.

use super::event::MessageOutcome;
use super::transition::{transition, TransitionError, LOCKED_ERROR};
use super::*;
use crate::client::SubmitResponse;
use chrono::Utc;
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

/// A user-level action, resolved into an [`Event`] against the current state
#[derive(Debug, Clone)]
enum Action {
    Type(String),
    Reply { content: String, market: Option<String> },
    Busy,
    Fail(String),
    Submit,
    Submitted { notion_url: Option<String> },
    SubmitFailed,
    NewSession(String),
    ClearError,
    Health(bool),
    /// An outcome addressed to a superseded session
    StaleReply(String),
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-zA-Z ]{1,30}",
        1 => "[ \t\n]{0,4}",
    ]
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => arb_text().prop_map(Action::Type),
        3 => ("[a-zA-Z ]{1,30}", proptest::option::of("m-[0-9]{1,3}"))
            .prop_map(|(content, market)| Action::Reply { content, market }),
        1 => Just(Action::Busy),
        1 => "[a-zA-Z ]{0,20}".prop_map(Action::Fail),
        1 => Just(Action::Submit),
        1 => proptest::option::of("https://[a-z]{3,8}\\.so/[a-z]{4}")
            .prop_map(|notion_url| Action::Submitted { notion_url }),
        1 => Just(Action::SubmitFailed),
        1 => "web-[0-9]{3}-[a-z0-9]{7}".prop_map(Action::NewSession),
        1 => Just(Action::ClearError),
        1 => any::<bool>().prop_map(Action::Health),
        1 => "[a-z]{1,10}".prop_map(Action::StaleReply),
    ]
}

fn to_event(state: &SessionState, action: Action) -> Event {
    let session_id = state.session_id.clone();
    let at = Utc::now();
    match action {
        Action::Type(text) => Event::UserMessage { text, at },
        Action::Reply { content, market } => Event::ReplyReceived {
            session_id,
            outcome: MessageOutcome::Reply {
                content,
                has_market: market.is_some(),
                market_id: market,
                eval_summary: None,
            },
            at,
        },
        Action::Busy => Event::ReplyReceived {
            session_id,
            outcome: MessageOutcome::Busy,
            at,
        },
        Action::Fail(message) => Event::SendFailed { session_id, message },
        Action::Submit => Event::SubmitRequested {
            user_id: "web-user".to_string(),
            link: "http://localhost:3000".to_string(),
        },
        Action::Submitted { notion_url } => Event::MarketSubmitted {
            market_id: state
                .current_market
                .as_ref()
                .map_or_else(|| "m-unknown".to_string(), |m| m.id.clone()),
            session_id,
            response: SubmitResponse {
                notion_url,
                ..SubmitResponse::default()
            },
            at,
        },
        Action::SubmitFailed => Event::SubmitFailed { session_id },
        Action::NewSession(id) => Event::NewSession { session_id: id },
        Action::ClearError => Event::ClearError,
        Action::Health(healthy) => Event::HealthChecked { healthy },
        Action::StaleReply(content) => Event::ReplyReceived {
            session_id: format!("{session_id}-old"),
            outcome: MessageOutcome::Reply {
                content,
                has_market: false,
                market_id: None,
                eval_summary: None,
            },
            at,
        },
    }
}

fn user_message(text: impl Into<String>) -> Event {
    Event::UserMessage {
        text: text.into(),
        at: Utc::now(),
    }
}

fn count(state: &SessionState, role: MessageRole) -> usize {
    state.messages.iter().filter(|m| m.role == role).count()
}

/// Invariants every reachable state satisfies
fn check_invariants(state: &SessionState) -> Result<(), TestCaseError> {
    // Ids strictly increase along the log
    for pair in state.messages.windows(2) {
        prop_assert!(pair[0].id < pair[1].id, "ids out of order: {:?}", state.messages);
    }

    // Every settled user message has exactly one assistant answer
    let pending = usize::from(state.is_loading());
    prop_assert_eq!(
        count(state, MessageRole::User),
        count(state, MessageRole::Assistant) + pending
    );

    // The pending message is the newest user message
    if let SessionPhase::Sending { pending_message_id } = state.phase {
        let newest_user = state
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.id);
        prop_assert_eq!(newest_user, Some(pending_message_id));
    }

    // The current market came from an assistant reply
    if let Some(market) = &state.current_market {
        let announced = state.messages.iter().any(|m| {
            m.role == MessageRole::Assistant
                && m.has_market
                && m.market_id.as_deref() == Some(market.id.as_str())
        });
        prop_assert!(announced, "market {} has no assistant reply", market.id);
    }
    Ok(())
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Any sequence of actions keeps the state well formed
    #[test]
    fn prop_invariants_hold(actions in proptest::collection::vec(arb_action(), 0..40)) {
        let mut state = SessionState::new("s-0");
        for action in actions {
            let event = to_event(&state, action);
            if let Ok(result) = transition(&state, event) {
                state = result.new_state;
            }
            check_invariants(&state)?;
        }
    }

    /// Blank input is rejected and changes nothing
    #[test]
    fn prop_blank_input_rejected(
        actions in proptest::collection::vec(arb_action(), 0..15),
        blank in "[ \t\n]{0,6}",
    ) {
        let mut state = SessionState::new("s-0");
        for action in actions {
            let event = to_event(&state, action);
            if let Ok(result) = transition(&state, event) {
                state = result.new_state;
            }
        }
        let result = transition(&state, user_message(blank));
        prop_assert_eq!(result.unwrap_err(), TransitionError::EmptyMessage);
    }

    /// A successful exchange grows the log by exactly two
    #[test]
    fn prop_success_adds_two_messages(
        history in proptest::collection::vec("[a-z]{1,10}", 0..5),
        text in "[a-zA-Z]{1,20}",
        reply in "[a-zA-Z ]{1,30}",
    ) {
        let mut state = SessionState::new("s-0");
        for earlier in history {
            state = transition(&state, user_message(earlier.clone())).unwrap().new_state;
            let answer = Action::Reply {
                content: earlier,
                market: None,
            };
            state = transition(&state, to_event(&state, answer)).unwrap().new_state;
        }
        let before = state.messages.len();

        let sending = transition(&state, user_message(text.clone())).unwrap();
        prop_assert_eq!(
            &sending.effects,
            &vec![Effect::send_message("s-0", text)]
        );
        let done = transition(
            &sending.new_state,
            to_event(&sending.new_state, Action::Reply { content: reply, market: None }),
        )
        .unwrap()
        .new_state;

        prop_assert_eq!(done.messages.len(), before + 2);
        prop_assert!(!done.is_loading());
    }

    /// Busy and failure outcomes leave the log as it was before the send
    #[test]
    fn prop_rejected_send_restores_length(
        text in "[a-zA-Z]{1,20}",
        busy in any::<bool>(),
        message in "[a-zA-Z ]{0,20}",
    ) {
        let state = SessionState::new("s-0");
        let before = state.messages.len();
        let sending = transition(&state, user_message(text)).unwrap().new_state;

        let outcome = if busy { Action::Busy } else { Action::Fail(message) };
        let after = transition(&sending, to_event(&sending, outcome)).unwrap().new_state;

        prop_assert_eq!(after.messages.len(), before);
        prop_assert!(!after.is_loading());
        prop_assert!(after.last_error.is_some());
        if busy {
            prop_assert!(after.locked);
            prop_assert_eq!(after.last_error.as_deref(), Some(LOCKED_ERROR));
        }
    }

    /// A new session always starts from the initial state
    #[test]
    fn prop_new_session_resets(
        actions in proptest::collection::vec(arb_action(), 0..20),
        id in "web-[0-9]{3}-[a-z0-9]{7}",
    ) {
        let mut state = SessionState::new("s-0");
        for action in actions {
            let event = to_event(&state, action);
            if let Ok(result) = transition(&state, event) {
                state = result.new_state;
            }
        }
        let was_sending = state.is_loading();

        let result = transition(&state, Event::NewSession { session_id: id.clone() }).unwrap();

        prop_assert_eq!(&result.new_state, &SessionState::new(id.clone()));
        prop_assert_eq!(result.effects.contains(&Effect::CancelSend), was_sending);
        prop_assert_eq!(result.effects.last(), Some(&Effect::create_session(id)));
    }

    /// Clearing the error twice is the same as clearing it once
    #[test]
    fn prop_clear_error_idempotent(actions in proptest::collection::vec(arb_action(), 0..20)) {
        let mut state = SessionState::new("s-0");
        for action in actions {
            let event = to_event(&state, action);
            if let Ok(result) = transition(&state, event) {
                state = result.new_state;
            }
        }
        let once = transition(&state, Event::ClearError).unwrap().new_state;
        let twice = transition(&once, Event::ClearError).unwrap().new_state;

        prop_assert!(once.last_error.is_none());
        prop_assert_eq!(once, twice);
    }

    /// Outcomes for another session never apply
    #[test]
    fn prop_stale_outcomes_rejected(
        text in "[a-zA-Z]{1,20}",
        content in "[a-z]{1,10}",
    ) {
        let state = SessionState::new("s-0");
        let sending = transition(&state, user_message(text)).unwrap().new_state;

        let result = transition(&sending, to_event(&sending, Action::StaleReply(content)));

        prop_assert!(matches!(result, Err(TransitionError::StaleSession(_))));
    }
}
