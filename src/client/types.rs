//! Wire types for the market backend API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /api/v1/sessions`
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest<'a> {
    pub client_session_id: &'a str,
    pub metadata: &'a Value,
}

/// Metadata attached to a freshly created session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub platform: String,
    pub created_at: String,
}

impl SessionMetadata {
    pub fn web_ui(created_at: DateTime<Utc>) -> Self {
        Self {
            platform: "web-ui".to_string(),
            created_at: created_at.to_rfc3339(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Body of `POST /api/v1/sessions/{id}/messages`
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest<'a> {
    pub message: &'a str,
}

/// Decoded reply to a chat message.
///
/// Fields are passed through as the backend sent them; deciding what a
/// given `status` means is up to the session layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub has_market: Option<bool>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub market_id: Option<String>,
    #[serde(default)]
    pub eval_summary: Option<Value>,
}

/// Submission metadata for a generated market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitMarket {
    pub session_id: String,
    pub user_id: String,
    pub link: String,
}

/// Reply to `POST /api/v1/markets/{id}/submit`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub notion_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accept ids sent either as strings or as numbers
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
