//! Chat session state machine
//!
//! Pure transitions over [`SessionState`] producing [`Effect`]s, plus the
//! [`ChatSession`] runtime that executes those effects against a
//! [`MarketApi`](crate::client::MarketApi).

mod effect;
pub mod event;
mod runtime;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Event, MessageOutcome};
pub use runtime::{ChatSession, SendStatus, SessionError};
pub use state::{ChatMessage, MarketRef, MessageRole, SessionPhase, SessionState};
pub use transition::{transition, TransitionError, TransitionResult};

use rand::Rng;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a client-side session id: `web-<unix millis>-<7 base36 chars>`
pub fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..7)
        .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
        .collect();
    format!("web-{}-{suffix}", chrono::Utc::now().timestamp_millis())
}
