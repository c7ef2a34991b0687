//! Long-polling Telegram bot answering `/start`, `/help` and unknown commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use relaybot::commands;
use relaybot::config::Config;
use relaybot::logging;
use relaybot::messenger::{Messenger, TelegramMessenger};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("Settings validation error")?;

    logging::init("command-bot", &config.logging.level);

    let telegram = TelegramMessenger::new(&config.telegram.bot_token);
    let bot = telegram.bot();
    let messenger: Arc<dyn Messenger> = Arc::new(telegram);

    info!(
        "Command bot instance running from {}",
        chrono::Local::now().format("%Y.%m.%d - %H:%M:%S")
    );
    commands::run(bot, messenger).await?;
    info!(
        "Command bot stopped at {}",
        chrono::Local::now().format("%Y%m%d_%H:%M:%S")
    );

    Ok(())
}
