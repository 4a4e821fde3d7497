//! Telegram debug bot for Flowdoctor.
//!
//! Users paste an automation ID or URL and get a diagnosis of its latest
//! run, then ask follow-up questions in the same chat.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//!
//! Optional:
//! - `FLOWDOCTOR_API_URL`: Automation API endpoint
//! - `FLOWDOCTOR_API_PASSWORD`: Password sent with each fetch
//! - `OPENROUTER_API_KEY`: Enables conversational explanations
//! - `OPENROUTER_MODEL`: Model to use (default: anthropic/claude-sonnet-4)
//! - `FLOWDOCTOR_GUIDE_PATH`: Debugging guide given to the assistant
//! - `FLOWDOCTOR_SESSION_TTL_SECS`: Idle time before a chat is forgotten
//!
//! # Example
//!
//! ```no_run
//! use flowdoctor_core::Settings;
//! use flowdoctor_telegram::FlowdoctorBot;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env();
//!     let bot = FlowdoctorBot::from_settings(&settings)?;
//!     bot.start_polling().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Commands
//!
//! - `/start` - Welcome message and menu keyboard
//! - `/help` - Show available commands
//! - `/debug [id]` - Diagnose an automation
//! - `/reset` - Forget the current automation
//! - `/status` - Show conversation status

pub mod bot;
pub mod conversation;
pub mod error;
pub mod handlers;
pub mod session;
pub mod state;
pub mod ui;

pub use bot::FlowdoctorBot;
pub use conversation::{classify, transition, Action, ConversationState, Input, MenuItem};
pub use error::{Result, TelegramError};
pub use session::Session;
pub use state::{create_shared_state, BotState};
