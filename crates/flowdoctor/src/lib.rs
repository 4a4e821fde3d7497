//! Flowdoctor CLI library.
//!
//! One-shot diagnosis and summaries from the terminal, plus launchers for
//! the HTTP debug API and the Telegram bot.

pub mod cli;
pub mod commands;
pub mod error;

pub use error::{CliError, Result};
