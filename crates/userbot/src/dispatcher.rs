//! Routes inbound commands to the first matching handler.

use crate::answer::Answer;
use crate::bot::Bot;
use crate::commands::CommandHandler;
use crate::error::{AppResult, WebhookError};
use crate::types::{Command, InboundMessage};
use tracing::{debug, error, info};

/// Ordered handler list. Registration order is match priority.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Vec<Box<dyn CommandHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handlers(handlers: Vec<Box<dyn CommandHandler>>) -> Self {
        Self { handlers }
    }

    pub fn register(&mut self, handler: impl CommandHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn register_boxed(&mut self, handler: Box<dyn CommandHandler>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Templates of all template-backed handlers, in registration order.
    pub fn templates(&self) -> Vec<String> {
        self.handlers
            .iter()
            .filter_map(|h| h.template().map(str::to_string))
            .collect()
    }

    /// Run the first handler that accepts `message.text`.
    pub async fn dispatch(&self, bot: &Bot, message: InboundMessage) -> AppResult<Option<Answer>> {
        for handler in &self.handlers {
            let arguments = match handler.try_match(&message.text) {
                Ok(Some(arguments)) => arguments,
                Ok(None) => continue,
                Err(e) => {
                    error!("Command matcher defect: {}", e);
                    if cfg!(debug_assertions) {
                        panic!("command matcher defect: {e}");
                    }
                    return Err(WebhookError::MatchArity(e).into());
                }
            };

            info!(
                "Command from user {} matched {}",
                message.user_id,
                handler.template().unwrap_or("custom handler")
            );
            let command = Command::new(message, arguments);
            return handler.run(bot, &command).await;
        }

        debug!("No handler for {:?}", message.text);
        Err(WebhookError::BadCommand(message.text).into())
    }
}
