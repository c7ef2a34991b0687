use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use relaybot::config::Config;
use relaybot::messenger::{Messenger, TelegramMessenger};
use relaybot::{logging, server};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("Settings validation error")?;

    logging::init("relay-api", &config.logging.level);

    info!(
        "Relay API instance starting at {}",
        chrono::Local::now().format("%Y.%m.%d - %H:%M:%S")
    );
    info!("  Application: {}", config.api.application_name);
    info!("  Bind address: {}", config.api.bind_address);

    let messenger: Arc<dyn Messenger> =
        Arc::new(TelegramMessenger::new(&config.telegram.bot_token));

    server::serve(&config, messenger)
        .await
        .context("Relay API failed")?;

    info!(
        "Relay API stopped at {}",
        chrono::Local::now().format("%Y%m%d_%H:%M:%S")
    );
    Ok(())
}
