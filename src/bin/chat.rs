//! Terminal driver for a market chat session
//!
//! Reads lines from stdin. Plain lines are sent as chat messages; lines
//! starting with `/` are commands.

use market_chat::client::{HttpMarketApi, LoggingApi, MarketApi};
use market_chat::config::ClientConfig;
use market_chat::session::{ChatSession, MessageRole, SendStatus, SessionState};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "Commands: /new, /submit [user], /health, /session, /clear, /quit";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Send(String),
    NewSession,
    Submit(Option<String>),
    Health,
    Session,
    ClearError,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };
    let mut parts = rest.split_whitespace();
    match parts.next() {
        Some("new") => Command::NewSession,
        Some("submit") => Command::Submit(parts.next().map(str::to_string)),
        Some("health") => Command::Health,
        Some("session") => Command::Session,
        Some("clear") => Command::ClearError,
        Some("quit" | "exit") => Command::Quit,
        _ => Command::Help,
    }
}

/// Prints messages as they appear, remembering what was already shown
#[derive(Default)]
struct Transcript {
    last_shown: u64,
    last_error: Option<String>,
}

impl Transcript {
    fn render(&mut self, state: &SessionState) {
        let shown = self.last_shown;
        for message in state.messages.iter().filter(|m| m.id > shown) {
            let who = match message.role {
                MessageRole::User => "you",
                MessageRole::Assistant => "market",
                MessageRole::System => "system",
            };
            println!("[{who}] {}", message.content);
            if message.has_market {
                if let Some(id) = &message.market_id {
                    println!("        market {id} ready; /submit to publish it");
                }
            }
            self.last_shown = message.id;
        }
        if state.last_error != self.last_error {
            if let Some(error) = &state.last_error {
                println!("! {error}");
            }
            self.last_error.clone_from(&state.last_error);
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ClientConfig::from_env();
    tracing::info!(target_url = %config.target.describe(), "Using market API");

    let api = LoggingApi::new(HttpMarketApi::new(&config)?);
    let chat = Arc::new(ChatSession::new(api, config.link.clone()));
    let mut transcript = Transcript::default();

    chat.init_session().await;
    println!("Session {}", chat.session_id());
    println!("{HELP}");
    transcript.render(&chat.snapshot());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Send(text) => {
                if chat.send_message(&text).await == SendStatus::Skipped && !text.is_empty() {
                    println!("(still waiting for the previous reply)");
                }
            }
            Command::NewSession => {
                let session_id = chat.new_session();
                transcript.reset();
                println!("Session {session_id}");
                let registering = Arc::clone(&chat);
                tokio::spawn(async move {
                    registering.init_session().await;
                });
            }
            Command::Submit(user) => {
                let user_id = user.unwrap_or_else(|| config.user_id.clone());
                match chat.submit_market(&user_id).await {
                    Ok(Some(_)) => {}
                    Ok(None) => println!("(no market to submit)"),
                    Err(e) => println!("! {e}"),
                }
            }
            Command::Health => {
                let healthy = chat.check_health().await;
                let verdict = if healthy { "healthy" } else { "unreachable" };
                println!("{}: {verdict}", chat.api().api_url());
            }
            Command::Session => match chat.get_session().await {
                Ok(Some(descriptor)) => println!("{}", serde_json::to_string_pretty(&descriptor)?),
                Ok(None) => println!("(backend does not know session {})", chat.session_id()),
                Err(e) => println!("! {e}"),
            },
            Command::ClearError => chat.clear_error(),
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
        transcript.render(&chat.snapshot());
    }

    Ok(())
}
