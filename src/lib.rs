//! Relaybot: an authenticated HTTP gateway that forwards text and files to
//! Telegram chats, plus a small long-polling command bot.

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod messenger;
pub mod metrics;
pub mod relay;
pub mod server;
