//! Compass userbot - serves one webhook call.
//!
//! Reads the webhook body from stdin and writes the synchronous answer to
//! stdout. Logs go to stderr.

use anyhow::Context;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use userbot::{builtin_handlers, AppResult, Bot, Config, Dispatcher, Payload, WebhookError};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.log.level);

    let bot = Bot::from_config(&config)?
        .with_dispatcher(Dispatcher::with_handlers(builtin_handlers()));

    info!(
        "Userbot ready ({:?} protocol, {} handlers)",
        bot.client().generation(),
        bot.dispatcher().len()
    );

    let mut body = String::new();
    tokio::io::stdin()
        .read_to_string(&mut body)
        .await
        .context("Failed to read webhook body")?;

    let post: Payload = serde_json::from_str(&body).map_err(WebhookError::InvalidBody)?;

    match bot.serve_webhook(&post).await {
        Ok(Some(answer)) => {
            let response = answer.into_sync_response();
            for (name, value) in &response.headers {
                debug!("{}: {}", name, value);
            }

            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(response.body.to_string().as_bytes())
                .await
                .context("Failed to write answer")?;
            stdout.flush().await.context("Failed to write answer")?;
        }
        Ok(None) => info!("Command served without answer"),
        Err(e) => {
            error!("Webhook rejected: {}", e);
            return Err(e);
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
