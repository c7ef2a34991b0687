use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, warn};

use crate::messenger::Messenger;

const START_REPLY: &str = "Hello! I'm JARVIS your personal AI assistant.";

const HELP_REPLY: &str = "Available commands:\n\
                          /start - Start the bot\n\
                          /help - Show this help message";

const UNKNOWN_REPLY: &str =
    "Sorry, I don't know that command. Use /help to see a list of available commands.";

/// Commands the bot answers. Anything else starting with `/` is `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Unknown(String),
}

impl Command {
    /// Parse the leading `/command` of a message, ignoring any `@botname`
    /// suffix and arguments. Returns `None` for non-command text, including
    /// a bare `/` and paths such as `/usr/bin`.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim_start().split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or_default();
        // Telegram only marks [A-Za-z0-9_] runs as bot commands
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }

        match name {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            other => Some(Command::Unknown(other.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Command::Start => "/start",
            Command::Help => "/help",
            Command::Unknown(_) => "unknown",
        }
    }

    pub fn reply(&self) -> &'static str {
        match self {
            Command::Start => START_REPLY,
            Command::Help => HELP_REPLY,
            Command::Unknown(_) => UNKNOWN_REPLY,
        }
    }
}

/// Reply to one command in the chat it came from.
pub async fn answer(
    messenger: &dyn Messenger,
    command: &Command,
    sender_id: u64,
    chat_id: i64,
) -> Result<()> {
    debug!(
        command = command.name(),
        sender = sender_id,
        chat_id,
        "Received command"
    );
    messenger.send_text(chat_id, command.reply()).await
}

/// Run the long-polling command bot until Ctrl-C.
pub async fn run(bot: Bot, messenger: Arc<dyn Messenger>) -> Result<()> {
    let handler = Update::filter_message()
        .filter_map(|msg: Message| msg.text().and_then(Command::parse))
        .endpoint(handle_command);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![messenger])
        .default_handler(|upd| async move {
            debug!("Ignoring update {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("command bot"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_command(
    msg: Message,
    command: Command,
    messenger: Arc<dyn Messenger>,
) -> Result<()> {
    let sender_id = match msg.from.as_ref() {
        Some(user) => user.id.0,
        None => {
            warn!(chat_id = msg.chat.id.0, "Command without a sender, ignoring");
            return Ok(());
        }
    };

    answer(messenger.as_ref(), &command, sender_id, msg.chat.id.0).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messenger::mock::{MockMessenger, Sent};

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/help"), Some(Command::Help));
        assert_eq!(Command::parse("  /help extra args"), Some(Command::Help));
        assert_eq!(Command::parse("/start@jarvis_bot"), Some(Command::Start));
    }

    #[test]
    fn test_parse_unknown_and_non_commands() {
        assert_eq!(
            Command::parse("/weather tomorrow"),
            Some(Command::Unknown("weather".to_string()))
        );
        assert_eq!(
            Command::parse("/Start"),
            Some(Command::Unknown("Start".to_string()))
        );
        assert_eq!(Command::parse("hello there"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn test_parse_rejects_non_command_slashes() {
        assert_eq!(Command::parse("/"), None);
        assert_eq!(Command::parse("/ help"), None);
        assert_eq!(Command::parse("/usr/bin is a directory"), None);
        assert_eq!(Command::parse("/start-now"), None);
        assert_eq!(
            Command::parse("/my_cmd2"),
            Some(Command::Unknown("my_cmd2".to_string()))
        );
    }

    #[test]
    fn test_replies() {
        assert!(Command::Start.reply().contains("JARVIS"));
        assert_eq!(
            Command::Help.reply(),
            "Available commands:\n/start - Start the bot\n/help - Show this help message"
        );
        assert!(Command::Unknown("x".into()).reply().contains("/help"));
    }

    #[tokio::test]
    async fn test_answer_sends_reply_to_origin_chat() {
        let messenger = MockMessenger::new();

        answer(&messenger, &Command::Help, 42, -1001).await.unwrap();
        answer(&messenger, &Command::Unknown("foo".into()), 42, 7)
            .await
            .unwrap();

        assert_eq!(
            messenger.sent(),
            vec![
                Sent::Text(-1001, HELP_REPLY.to_string()),
                Sent::Text(7, UNKNOWN_REPLY.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_answer_propagates_send_failure() {
        let messenger = MockMessenger::failing_text();
        assert!(answer(&messenger, &Command::Start, 1, 1).await.is_err());
    }
}
