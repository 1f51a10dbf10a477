//! Userbot data types.

use crate::commands::Arguments;
use serde::Deserialize;
use serde_json::Value;
use userbot_client::Payload;

/// Company member.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub user_name: String,
    #[serde(default)]
    pub avatar_file_url: String,
}

/// Group the bot is a member of.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawGroup")]
pub struct Group {
    pub group_id: String,
    pub name: String,
    pub avatar_file_url: String,
}

/// Older servers answer with `conversation_key`/`group_name`.
#[derive(Deserialize)]
struct RawGroup {
    group_id: Option<String>,
    conversation_key: Option<String>,
    name: Option<String>,
    group_name: Option<String>,
    #[serde(default)]
    avatar_file_url: String,
}

impl TryFrom<RawGroup> for Group {
    type Error = &'static str;

    fn try_from(raw: RawGroup) -> Result<Self, Self::Error> {
        Ok(Self {
            group_id: raw
                .group_id
                .or(raw.conversation_key)
                .ok_or("missing field `group_id`")?,
            name: raw.name.or(raw.group_name).ok_or("missing field `name`")?,
            avatar_file_url: raw.avatar_file_url,
        })
    }
}

/// Result of a file upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawUploadedFile")]
pub struct UploadedFile {
    pub file_id: String,
}

#[derive(Deserialize)]
struct RawUploadedFile {
    file_id: Option<String>,
    file_key: Option<String>,
}

impl TryFrom<RawUploadedFile> for UploadedFile {
    type Error = &'static str;

    fn try_from(raw: RawUploadedFile) -> Result<Self, Self::Error> {
        raw.file_id
            .or(raw.file_key)
            .map(|file_id| Self { file_id })
            .ok_or("missing field `file_id`")
    }
}

/// Inbound webhook message after envelope verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub text: String,
    pub user_id: i64,
    pub message_id: String,
    pub group_id: String,
}

impl InboundMessage {
    /// Extract the fields the dispatcher needs. Returns the name of the
    /// first missing or mistyped field on failure.
    pub fn from_payload(payload: &Payload) -> Result<Self, &'static str> {
        let text = payload
            .get("text")
            .and_then(Value::as_str)
            .ok_or("text")?
            .to_string();
        let user_id = payload.get("user_id").and_then(as_i64).ok_or("user_id")?;
        let message_id = payload
            .get("message_id")
            .and_then(as_string)
            .ok_or("message_id")?;
        let group_id = match payload.get("group_id") {
            None | Some(Value::Null) => String::new(),
            Some(value) => as_string(value).ok_or("group_id")?,
        };

        Ok(Self {
            text,
            user_id,
            message_id,
            group_id,
        })
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A parsed command handed to a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The raw command line.
    pub line: String,
    pub sender_id: i64,
    pub message_id: String,
    /// Empty for private conversations.
    pub group_id: String,
    /// Arguments in template order, keyed by placeholder name.
    pub arguments: Arguments,
}

impl Command {
    pub fn new(message: InboundMessage, arguments: Arguments) -> Self {
        Self {
            line: message.text,
            sender_id: message.user_id,
            message_id: message.message_id,
            group_id: message.group_id,
            arguments,
        }
    }

    /// Argument value by placeholder name.
    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments.get(name)
    }
}
