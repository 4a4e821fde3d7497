//! Error types for the Telegram bot.

use flowdoctor_core::FetchError;
use thiserror::Error;

/// Errors that can occur in the Telegram bot.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bot token not provided or invalid.
    #[error("Telegram bot token not set. Set TELEGRAM_BOT_TOKEN environment variable.")]
    NoToken,

    /// Failed to start the bot.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// The automation client could not be built.
    #[error("Automation client error: {0}")]
    Fetch(#[from] FetchError),

    /// Telegram API request failed.
    #[error("Telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert!(TelegramError::NoToken.to_string().contains("TELEGRAM_BOT_TOKEN"));

        let err: TelegramError = FetchError::InvalidEndpoint("nope".into()).into();
        assert!(err.to_string().starts_with("Automation client error"));
    }
}
