//! Synchronous answers to webhook calls.

use crate::error::{AppError, AppResult};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};

pub const SEND_CHAT_MESSAGE_ACTION: &str = "message_send";
pub const SEND_THREAD_MESSAGE_ACTION: &str = "thread_send";
pub const ADD_REACTION_ACTION: &str = "message_addreaction";

/// Action the server performs on behalf of the bot after the webhook returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    action: String,
    fields: Map<String, Value>,
}

impl Answer {
    pub fn new(action: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            action: action.into(),
            fields,
        }
    }

    /// Text message to the conversation the command came from.
    pub fn chat_message(text: &str) -> AppResult<Self> {
        ensure(text, "passed incorrect message text")?;
        Ok(Self::with(SEND_CHAT_MESSAGE_ACTION, json!({"type": "text", "text": text})))
    }

    /// File message to the conversation the command came from.
    pub fn chat_file(file_id: &str) -> AppResult<Self> {
        ensure(file_id, "passed incorrect file id")?;
        Ok(Self::with(SEND_CHAT_MESSAGE_ACTION, json!({"type": "file", "file_id": file_id})))
    }

    /// Text message to the thread of the command message.
    pub fn thread_message(text: &str) -> AppResult<Self> {
        ensure(text, "passed incorrect message text")?;
        Ok(Self::with(SEND_THREAD_MESSAGE_ACTION, json!({"type": "text", "text": text})))
    }

    /// File message to the thread of the command message.
    pub fn thread_file(file_id: &str) -> AppResult<Self> {
        ensure(file_id, "passed incorrect file id")?;
        Ok(Self::with(SEND_THREAD_MESSAGE_ACTION, json!({"type": "file", "file_id": file_id})))
    }

    /// Reaction on the command message.
    pub fn chat_reaction(reaction: &str) -> AppResult<Self> {
        ensure(reaction, "passed incorrect reaction")?;
        Ok(Self::with(ADD_REACTION_ACTION, json!({"reaction": reaction})))
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// `{"answer": {"action": ..., ...fields}}`
    pub fn to_json(&self) -> Value {
        let mut answer = self.fields.clone();
        answer.insert("action".into(), Value::String(self.action.clone()));
        json!({ "answer": answer })
    }

    /// HTTP response for the webhook call.
    pub fn into_sync_response(self) -> SyncResponse {
        let last_modified = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();

        SyncResponse {
            status: 200,
            headers: vec![
                ("Last-Modified".into(), last_modified),
                (
                    "Cache-Control".into(),
                    "no-store, no-cache, must-revalidate".into(),
                ),
                ("Pragma".into(), "no-cache".into()),
                (
                    "Content-Type".into(),
                    "application/json;charset=UTF-8".into(),
                ),
            ],
            body: self.to_json(),
        }
    }

    fn with(action: &str, fields: Value) -> Self {
        match fields {
            Value::Object(fields) => Self::new(action, fields),
            _ => Self::new(action, Map::new()),
        }
    }
}

fn ensure(value: &str, message: &str) -> AppResult<()> {
    if value.is_empty() {
        return Err(AppError::invalid(message));
    }
    Ok(())
}

/// Rendered synchronous answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl SyncResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
