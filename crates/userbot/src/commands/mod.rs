//! Bot command handlers.

mod echo;
mod ping;
mod template;

pub use echo::EchoAction;
pub use ping::PingAction;
pub use template::{Arguments, CommandTemplate, MatchArityError};

use crate::answer::Answer;
use crate::bot::Bot;
use crate::error::AppResult;
use crate::types::Command;
use async_trait::async_trait;

/// Command handler trait.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Template registered with the server, if any.
    fn template(&self) -> Option<&str> {
        None
    }

    /// Arguments when the handler accepts `line`, `None` otherwise.
    fn try_match(&self, line: &str) -> Result<Option<Arguments>, MatchArityError>;

    /// Execute the command. The returned answer is sent back synchronously.
    async fn run(&self, bot: &Bot, command: &Command) -> AppResult<Option<Answer>>;
}

/// Body of a template-matched command.
#[async_trait]
pub trait CommandAction: Send + Sync {
    async fn run(&self, bot: &Bot, command: &Command) -> AppResult<Option<Answer>>;
}

/// Handler pairing a [`CommandTemplate`] with an action.
pub struct TemplateCommand<A> {
    template: CommandTemplate,
    action: A,
}

impl<A: CommandAction> TemplateCommand<A> {
    pub fn new(template: impl Into<String>, action: A) -> Self {
        Self {
            template: CommandTemplate::new(template),
            action,
        }
    }
}

#[async_trait]
impl<A: CommandAction> CommandHandler for TemplateCommand<A> {
    fn template(&self) -> Option<&str> {
        Some(self.template.as_str())
    }

    fn try_match(&self, line: &str) -> Result<Option<Arguments>, MatchArityError> {
        self.template.try_match(line)
    }

    async fn run(&self, bot: &Bot, command: &Command) -> AppResult<Option<Answer>> {
        self.action.run(bot, command).await
    }
}

/// Handlers served by the `userbot` binary.
pub fn builtin_handlers() -> Vec<Box<dyn CommandHandler>> {
    vec![
        Box::new(TemplateCommand::new("/ping", PingAction)),
        Box::new(TemplateCommand::new("/echo [text]", EchoAction)),
    ]
}
