//! Echo command - replies in the thread with the captured text.

use crate::answer::Answer;
use crate::bot::Bot;
use crate::commands::CommandAction;
use crate::error::{AppError, AppResult};
use crate::types::Command;
use async_trait::async_trait;
use tracing::debug;

pub struct EchoAction;

#[async_trait]
impl CommandAction for EchoAction {
    async fn run(&self, _bot: &Bot, command: &Command) -> AppResult<Option<Answer>> {
        let text = command
            .arguments
            .values()
            .next()
            .ok_or_else(|| AppError::Handler("echo needs an argument".into()))?;

        debug!("Echoing {} chars for user {}", text.len(), command.sender_id);
        Answer::thread_message(text).map(Some)
    }
}
