//! Ping command - liveness check.

use crate::answer::Answer;
use crate::bot::Bot;
use crate::commands::CommandAction;
use crate::error::AppResult;
use crate::types::Command;
use async_trait::async_trait;

pub struct PingAction;

#[async_trait]
impl CommandAction for PingAction {
    async fn run(&self, _bot: &Bot, _command: &Command) -> AppResult<Option<Answer>> {
        Answer::chat_message("pong").map(Some)
    }
}
