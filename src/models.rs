// Data structures (chat turns, request and response bodies)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::{Message, MessageRole};
use crate::store::Row;
use crate::tables::owner_from_value;

/// Table holding persisted conversation turns
pub const CHAT_HISTORY_TABLE: &str = "chat_history";

// Turn Role Enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl From<TurnRole> for MessageRole {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => MessageRole::User,
            TurnRole::Assistant => MessageRole::Assistant,
        }
    }
}

// Conversation Turn
//
// Stored in `chat_history` as `{user_id, message, is_user}`; the store assigns
// `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
    pub owner_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ConversationTurn {
    pub fn user(owner_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            owner_id: Some(owner_id.into()),
            timestamp: None,
        }
    }

    pub fn assistant(owner_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
            owner_id: Some(owner_id.into()),
            timestamp: None,
        }
    }

    /// Row written to the chat history table
    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        if let Some(owner_id) = &self.owner_id {
            row.insert("user_id".to_string(), Value::String(owner_id.clone()));
        }
        row.insert("message".to_string(), Value::String(self.text.clone()));
        row.insert(
            "is_user".to_string(),
            Value::Bool(self.role == TurnRole::User),
        );
        row
    }

    /// Parse a persisted chat history row; `None` when `message` is missing
    pub fn from_row(row: &Row) -> Option<Self> {
        let text = row.get("message")?.as_str()?.to_string();
        let role = match row.get("is_user").and_then(Value::as_bool) {
            Some(false) => TurnRole::Assistant,
            _ => TurnRole::User,
        };
        let owner_id = row
            .get("user_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        let timestamp = row
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc));

        Some(Self {
            role,
            text,
            owner_id,
            timestamp,
        })
    }

    /// The turn as sent to the model service
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role.into(),
            text: self.text.clone(),
        }
    }
}

// Request Types
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user_id: Option<Value>,
}

impl ChatRequest {
    /// Owner id as a string; numeric ids are accepted, empty ones are not
    pub fn owner_id(&self) -> Option<String> {
        self.user_id.as_ref().and_then(owner_from_value)
    }
}

// A history write that failed while the reply itself was delivered
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistenceWarning {
    pub role: TurnRole,
    pub error: String,
}

// Chat Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PersistenceWarning>,
}

// Error body shared by every failure response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
