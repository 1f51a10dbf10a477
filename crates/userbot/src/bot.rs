//! Compass userbot facade: business API methods and webhook serving.

use crate::answer::Answer;
use crate::commands::CommandHandler;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::{AppError, AppResult, WebhookError};
use crate::mention::{DirectoryMentionResolver, MentionResolver};
use crate::types::{Group, InboundMessage, UploadedFile, User};
use anyhow::Context;
use async_stream::try_stream;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, instrument, warn};
use userbot_client::{
    codec, Generation, Payload, RequestError, RequestSession, UrlProvider, UserbotClient,
};

pub const GET_USERS_MAX_LIMIT: i64 = 300;
pub const GET_GROUPS_MAX_LIMIT: i64 = 300;

pub const SEND_PRIVATE_MESSAGE_METHOD: &str = "user/send";
pub const SEND_GROUP_MESSAGE_METHOD: &str = "group/send";
pub const SEND_THREAD_MESSAGE_METHOD: &str = "thread/send";
pub const ADD_MESSAGE_REACTION_METHOD: &str = "message/addReaction";
pub const REMOVE_MESSAGE_REACTION_METHOD: &str = "message/removeReaction";
pub const GET_FILE_UPLOAD_URL_METHOD: &str = "file/getUrl";
pub const GET_USERS_METHOD: &str = "user/getList";
pub const GET_GROUPS_METHOD: &str = "group/getList";
pub const GET_COMMANDS_METHOD: &str = "command/getList";
pub const UPDATE_COMMANDS_METHOD: &str = "command/update";
pub const GET_WEBHOOK_VERSION_METHOD: &str = "webhook/getVersion";
pub const SET_WEBHOOK_VERSION_METHOD: &str = "webhook/setVersion";

/// Compass userbot.
///
/// Owns the API client, the command dispatcher and the mention resolver used
/// for outgoing text. All methods validate their inputs before any I/O.
pub struct Bot {
    client: UserbotClient,
    dispatcher: Dispatcher,
    mentions: Arc<dyn MentionResolver>,
}

impl Bot {
    pub fn new(client: UserbotClient) -> Self {
        Self {
            client,
            dispatcher: Dispatcher::new(),
            mentions: Arc::new(DirectoryMentionResolver),
        }
    }

    /// Build a bot with an HTTP client from configuration.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let client = UserbotClient::new(
            config.userbot.credentials(),
            UrlProvider::new(config.userbot.endpoint.clone()),
            config.http.timeout,
            &config.http.user_agent,
        )
        .context("Failed to create userbot client")?
        .with_poll_interval(config.poll.interval)
        .with_wait_timeout(config.poll.timeout);

        Ok(Self::new(client))
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_handler(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.dispatcher.register(handler);
        self
    }

    pub fn with_mention_resolver(mut self, resolver: impl MentionResolver + 'static) -> Self {
        self.mentions = Arc::new(resolver);
        self
    }

    pub fn client(&self) -> &UserbotClient {
        &self.client
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Start a raw API request.
    pub fn make_request(&self) -> RequestSession {
        self.client.make_request()
    }

    /// Call an API method in the default flow: sign, send, wait.
    pub async fn call(&self, method: &str, payload: Payload) -> AppResult<Value> {
        Ok(self.client.call(method, payload).await?)
    }

    /// Verify and dispatch one inbound webhook post.
    #[instrument(skip(self, post))]
    pub async fn serve_webhook(&self, post: &Payload) -> AppResult<Option<Answer>> {
        let payload = match self.client.generation() {
            Generation::Signed => {
                codec::decode_signed(self.client.credentials(), post).map_err(|e| {
                    warn!("Rejected webhook: {}", e);
                    WebhookError::BadRequest(e)
                })?
            }
            Generation::Legacy => post.clone(),
        };

        let message = InboundMessage::from_payload(&payload).map_err(WebhookError::MissingField)?;
        self.dispatcher.dispatch(self, message).await
    }

    /// One page of company members.
    pub async fn get_users(&self, limit: i64, offset: i64) -> AppResult<Vec<User>> {
        check_page(limit, offset, GET_USERS_MAX_LIMIT)?;

        let response = self
            .call(GET_USERS_METHOD, payload(json!({"limit": limit, "offset": offset})))
            .await?;
        field(&response, "user_list")
    }

    /// All company members, one page of [`GET_USERS_MAX_LIMIT`] per item.
    pub fn users(&self) -> impl Stream<Item = AppResult<Vec<User>>> + '_ {
        try_stream! {
            let mut offset = 0;
            loop {
                let page = self.get_users(GET_USERS_MAX_LIMIT, offset).await?;
                let last = (page.len() as i64) < GET_USERS_MAX_LIMIT;
                offset += GET_USERS_MAX_LIMIT;
                yield page;
                if last {
                    break;
                }
            }
        }
    }

    /// Find a member by id, paging through the user list.
    pub async fn get_user(&self, user_id: i64) -> AppResult<User> {
        ensure(user_id > 0, "passed empty user id")?;

        let mut pages = Box::pin(self.users());
        while let Some(page) = pages.next().await {
            if let Some(user) = page?.into_iter().find(|u| u.user_id == user_id) {
                return Ok(user);
            }
        }

        Err(AppError::UserNotFound(user_id))
    }

    /// One page of groups the bot is a member of.
    pub async fn get_groups(&self, limit: i64, offset: i64) -> AppResult<Vec<Group>> {
        check_page(limit, offset, GET_GROUPS_MAX_LIMIT)?;

        let response = self
            .call(GET_GROUPS_METHOD, payload(json!({"limit": limit, "offset": offset})))
            .await?;
        field(&response, "group_list")
    }

    /// Send text to a private conversation. Returns the message id.
    pub async fn send_private_message(&self, user_id: i64, text: &str) -> AppResult<String> {
        ensure(user_id > 0, "passed empty user id")?;
        ensure(!text.is_empty(), "passed empty message")?;

        let text = self.mentions.resolve(self, text).await?;
        self.send(
            SEND_PRIVATE_MESSAGE_METHOD,
            json!({"text": text, "type": "text", "user_id": user_id}),
        )
        .await
    }

    /// Send text to a group conversation. Returns the message id.
    pub async fn send_group_message(&self, group_id: &str, text: &str) -> AppResult<String> {
        ensure(!group_id.is_empty(), "passed empty group id")?;
        ensure(!text.is_empty(), "passed empty message")?;

        let text = self.mentions.resolve(self, text).await?;
        self.send(
            SEND_GROUP_MESSAGE_METHOD,
            json!({"text": text, "type": "text", "group_id": group_id}),
        )
        .await
    }

    /// Send text to the thread of a message. Returns the message id.
    pub async fn send_thread_message(&self, message_id: &str, text: &str) -> AppResult<String> {
        ensure(!message_id.is_empty(), "passed empty message id")?;
        ensure(!text.is_empty(), "passed empty message")?;

        let text = self.mentions.resolve(self, text).await?;
        self.send(
            SEND_THREAD_MESSAGE_METHOD,
            json!({"text": text, "type": "text", "message_id": message_id}),
        )
        .await
    }

    pub async fn send_file_to_private(
        &self,
        user_id: i64,
        path: impl AsRef<Path>,
    ) -> AppResult<String> {
        ensure(user_id > 0, "passed empty user id")?;

        let file = self.get_file_upload_info(path).await?;
        self.send(
            SEND_PRIVATE_MESSAGE_METHOD,
            json!({"user_id": user_id, "type": "file", "file_id": file.file_id}),
        )
        .await
    }

    pub async fn send_file_to_group(
        &self,
        group_id: &str,
        path: impl AsRef<Path>,
    ) -> AppResult<String> {
        ensure(!group_id.is_empty(), "passed empty group id")?;

        let file = self.get_file_upload_info(path).await?;
        self.send(
            SEND_GROUP_MESSAGE_METHOD,
            json!({"group_id": group_id, "type": "file", "file_id": file.file_id}),
        )
        .await
    }

    pub async fn send_file_to_thread(
        &self,
        message_id: &str,
        path: impl AsRef<Path>,
    ) -> AppResult<String> {
        ensure(!message_id.is_empty(), "passed empty message id")?;

        let file = self.get_file_upload_info(path).await?;
        self.send(
            SEND_THREAD_MESSAGE_METHOD,
            json!({"message_id": message_id, "type": "file", "file_id": file.file_id}),
        )
        .await
    }

    /// Upload a file: fetch an upload node and token, then post the file
    /// there unsigned.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn get_file_upload_info(&self, path: impl AsRef<Path>) -> AppResult<UploadedFile> {
        let path = path.as_ref();
        let is_file = tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        ensure(is_file, &format!("file {} not found", path.display()))?;

        let target = self.call(GET_FILE_UPLOAD_URL_METHOD, Payload::new()).await?;
        let node_url: String = field(&target, "node_url")?;
        let file_token: String = field(&target, "file_token")?;
        debug!("Uploading to {}", node_url);

        let sent = self
            .make_request()
            .with_sign(false)
            .with_address(node_url)
            .with_message(payload(json!({"token": file_token})))
            .with_file(path)
            .send()
            .await?;

        let result = sent.result().cloned().unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(|e| unexpected(format!("bad upload result: {e}")))
    }

    /// Add a reaction (emoji or short name) to a message.
    pub async fn react_on_message(&self, message_id: &str, reaction: &str) -> AppResult<()> {
        self.reaction(ADD_MESSAGE_REACTION_METHOD, message_id, reaction).await
    }

    pub async fn remove_reaction_from_message(
        &self,
        message_id: &str,
        reaction: &str,
    ) -> AppResult<()> {
        self.reaction(REMOVE_MESSAGE_REACTION_METHOD, message_id, reaction)
            .await
    }

    /// Commands currently served by the webhook.
    pub async fn get_commands(&self) -> AppResult<Vec<String>> {
        let response = self.call(GET_COMMANDS_METHOD, Payload::new()).await?;
        field(&response, "command_list")
    }

    /// Merge `commands` into the served list. Existing commands are kept;
    /// concurrent remote edits may be lost.
    pub async fn add_commands<I, S>(&self, commands: I) -> AppResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let commands: Vec<String> = commands.into_iter().map(Into::into).collect();
        ensure(!commands.is_empty(), "no commands passed")?;
        if let Some(bad) = commands.iter().find(|c| c.is_empty()) {
            return Err(AppError::invalid(format!("passed incorrect command '{bad}'")));
        }

        let mut merged = self.get_commands().await?;
        for command in commands {
            if !merged.contains(&command) {
                merged.push(command);
            }
        }

        info!("Updating command list ({} commands)", merged.len());
        self.update_commands(merged).await
    }

    /// Remove one command. Missing commands are ignored.
    pub async fn remove_command(&self, command: &str) -> AppResult<()> {
        ensure(!command.is_empty(), "passed incorrect command ''")?;

        let mut commands = self.get_commands().await?;
        let Some(pos) = commands.iter().position(|c| c == command) else {
            return Ok(());
        };

        commands.remove(pos);
        self.update_commands(commands).await
    }

    pub async fn clear_commands(&self) -> AppResult<()> {
        self.update_commands(Vec::new()).await
    }

    pub async fn get_webhook_version(&self) -> AppResult<i64> {
        let response = self.call(GET_WEBHOOK_VERSION_METHOD, Payload::new()).await?;
        field(&response, "version")
    }

    pub async fn set_webhook_version(&self, version: i64) -> AppResult<()> {
        ensure(version > 0, "passed incorrect version")?;

        self.call(SET_WEBHOOK_VERSION_METHOD, payload(json!({"version": version})))
            .await?;
        Ok(())
    }

    async fn send(&self, method: &str, body: Value) -> AppResult<String> {
        let response = self.call(method, payload(body)).await?;
        field(&response, "message_id")
    }

    async fn reaction(&self, method: &str, message_id: &str, reaction: &str) -> AppResult<()> {
        ensure(!message_id.is_empty(), "passed empty message id")?;
        ensure(!reaction.is_empty(), "passed empty reaction")?;

        self.call(
            method,
            payload(json!({"message_id": message_id, "reaction": reaction})),
        )
        .await?;
        Ok(())
    }

    async fn update_commands(&self, commands: Vec<String>) -> AppResult<()> {
        self.call(UPDATE_COMMANDS_METHOD, payload(json!({"command_list": commands})))
            .await?;
        Ok(())
    }
}

fn ensure(condition: bool, message: &str) -> AppResult<()> {
    if condition {
        Ok(())
    } else {
        Err(AppError::invalid(message))
    }
}

fn check_page(limit: i64, offset: i64, max: i64) -> AppResult<()> {
    ensure(limit > 0 && limit <= max, "passed incorrect limit")?;
    ensure(offset >= 0, "passed incorrect offset")
}

fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

fn unexpected(message: String) -> AppError {
    AppError::Request(RequestError::UnexpectedResponse {
        status: None,
        code: None,
        message,
    })
}

/// Typed field of an API result.
fn field<T: DeserializeOwned>(response: &Value, name: &str) -> AppResult<T> {
    let value = response
        .get(name)
        .cloned()
        .ok_or_else(|| unexpected(format!("response has no '{name}' field")))?;

    serde_json::from_value(value).map_err(|e| unexpected(format!("bad '{name}' field: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use userbot_client::{
        Credentials, ErrorKind, HttpResponse, RequestBody, Transport, TransportError,
    };

    /// Answers every call with an empty ok result and counts calls.
    #[derive(Default)]
    struct CountingTransport {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn post(
            &self,
            _url: &str,
            _body: RequestBody,
            _headers: Vec<(String, String)>,
        ) -> Result<HttpResponse, TransportError> {
            *self.calls.lock().unwrap() += 1;
            Ok(HttpResponse::new(200, r#"{"status":"ok","response":{}}"#))
        }
    }

    fn test_bot() -> (Bot, Arc<CountingTransport>) {
        let transport = Arc::new(CountingTransport::default());
        let client = UserbotClient::with_transport(
            transport.clone(),
            Credentials::new("test-token"),
            UrlProvider::default(),
        );
        (Bot::new(client), transport)
    }

    fn assert_invalid<T: std::fmt::Debug>(result: AppResult<T>) {
        match result {
            Err(AppError::Request(err)) => assert_eq!(err.kind(), ErrorKind::InvalidRequest),
            other => panic!("expected invalid request, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_input_validation_precedes_io() {
        let (bot, transport) = test_bot();

        assert_invalid(bot.get_users(0, 0).await);
        assert_invalid(bot.get_users(301, 0).await);
        assert_invalid(bot.get_users(10, -1).await);
        assert_invalid(bot.get_groups(-5, 0).await);
        assert_invalid(bot.get_user(0).await);
        assert_invalid(bot.send_private_message(0, "hi").await);
        assert_invalid(bot.send_private_message(1, "").await);
        assert_invalid(bot.send_group_message("", "hi").await);
        assert_invalid(bot.send_thread_message("m-1", "").await);
        assert_invalid(bot.send_file_to_group("", "/tmp").await);
        assert_invalid(bot.react_on_message("", ":+1:").await);
        assert_invalid(bot.remove_reaction_from_message("m-1", "").await);
        assert_invalid(bot.add_commands(Vec::<String>::new()).await);
        assert_invalid(bot.add_commands(["/ok", ""]).await);
        assert_invalid(bot.remove_command("").await);
        assert_invalid(bot.set_webhook_version(0).await);
        assert_invalid(bot.get_file_upload_info("/definitely/not/here.bin").await);

        assert_eq!(*transport.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_result_field_is_unexpected() {
        let (bot, _) = test_bot();

        let err = bot.get_webhook_version().await.unwrap_err();
        match err {
            AppError::Request(err) => assert_eq!(err.kind(), ErrorKind::UnexpectedResponse),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_field_types() {
        let response = json!({"version": 3, "command_list": ["/a"], "message_id": 5});

        assert_eq!(field::<i64>(&response, "version").unwrap(), 3);
        assert_eq!(
            field::<Vec<String>>(&response, "command_list").unwrap(),
            vec!["/a"]
        );
        assert!(field::<String>(&response, "message_id").is_err());
    }
}
