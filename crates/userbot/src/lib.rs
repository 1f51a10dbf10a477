//! Compass userbot: command templates, webhook dispatch and the business API.

pub mod answer;
mod bot;
pub mod commands;
pub mod config;
mod dispatcher;
pub mod error;
pub mod mention;
pub mod types;

pub use answer::{Answer, SyncResponse};
pub use bot::*;
pub use commands::{
    builtin_handlers, Arguments, CommandAction, CommandHandler, CommandTemplate, MatchArityError,
    TemplateCommand,
};
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use error::{AppError, AppResult, WebhookError};
pub use mention::{DirectoryMentionResolver, MentionResolver, NoopMentionResolver};
pub use types::{Command, Group, InboundMessage, UploadedFile, User};
pub use userbot_client::{Credentials, Generation, Payload, UrlProvider, UserbotClient};
