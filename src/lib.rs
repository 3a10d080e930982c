//! Market Chat
//!
//! A conversational client for a prediction-market backend: the session
//! state machine and its runtime, the backend API client, and the reverse
//! proxy gateway that fronts the backend for the web UI.

pub mod client;
pub mod config;
pub mod gateway;
pub mod session;

#[cfg(test)]
mod test_support;
