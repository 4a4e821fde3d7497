//! Main Telegram bot implementation.

use std::sync::Arc;
use std::time::Duration;

use flowdoctor_core::{Assistant, AutomationClient, Settings};
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::utils::command::BotCommands;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::error::{Result, TelegramError};
use crate::handlers::{handle_callback, handle_command, handle_message, Command};
use crate::state::{create_shared_state, BotState};

/// How often idle sessions are swept.
const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// The Flowdoctor Telegram bot.
pub struct FlowdoctorBot {
    /// The teloxide bot instance.
    bot: Bot,
    /// Shared state across handlers.
    state: Arc<BotState>,
}

impl FlowdoctorBot {
    pub fn new(token: impl Into<String>, state: Arc<BotState>) -> Self {
        Self {
            bot: Bot::new(token),
            state,
        }
    }

    /// Build the bot, its automation client and assistant from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let token = settings
            .telegram_bot_token
            .clone()
            .ok_or(TelegramError::NoToken)?;

        let client = AutomationClient::from_settings(settings)?;
        let assistant = Assistant::from_settings(settings);
        info!(
            endpoint = %client.endpoint(),
            assistant = assistant.is_enabled(),
            "Bot collaborators ready"
        );

        let state = create_shared_state(Arc::new(client), assistant, settings.session_ttl);
        Ok(Self::new(token, state))
    }

    pub fn state(&self) -> &Arc<BotState> {
        &self.state
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Start the bot in polling mode. Runs until Ctrl+C.
    pub async fn start_polling(&self) -> Result<()> {
        info!("Starting Telegram bot in polling mode...");

        let bot = self.bot.clone();
        let state = Arc::clone(&self.state);

        if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
            warn!(error = %e, "Failed to register bot commands");
        }

        let sweep_state = Arc::clone(&self.state);
        tokio::spawn(async move {
            evict_idle_loop(sweep_state).await;
        });

        let state_for_commands = Arc::clone(&state);
        let state_for_messages = Arc::clone(&state);
        let state_for_callbacks = Arc::clone(&state);

        let handler = dptree::entry()
            .branch(
                Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
                    let state = Arc::clone(&state_for_callbacks);
                    async move { handle_callback(bot, q, state).await }
                }),
            )
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let state = Arc::clone(&state_for_commands);
                        info!(chat_id = %msg.chat.id, "Command matched: {:?}", cmd);
                        async move { handle_command(bot, msg, cmd, state).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.text().is_some_and(|t| t.starts_with('/')))
                    .endpoint(|bot: Bot, msg: Message| async move {
                        if let Some(text) = msg.text() {
                            let name = text.split_whitespace().next().unwrap_or(text);
                            info!(cmd = %name, "Unrecognized command");
                            bot.send_message(
                                msg.chat.id,
                                format!("Unknown command: {name}\n\nUse /help to see available commands."),
                            )
                            .await?;
                        }
                        Ok::<(), teloxide::RequestError>(())
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.text().is_some_and(|t| !t.starts_with('/')))
                    .endpoint(move |bot: Bot, msg: Message| {
                        let state = Arc::clone(&state_for_messages);
                        debug!(chat_id = %msg.chat.id, "Regular message received");
                        async move { handle_message(bot, msg, state).await }
                    }),
            );

        info!("Bot is running! Send /start to begin.");

        Dispatcher::builder(bot, handler)
            .default_handler(|upd| async move {
                debug!("Unhandled update: {:?}", upd.kind);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}

/// Background task that drops idle sessions.
async fn evict_idle_loop(state: Arc<BotState>) {
    let period = EVICTION_INTERVAL
        .min(state.session_ttl())
        .max(Duration::from_secs(1));
    let mut sweep = interval(period);
    loop {
        sweep.tick().await;
        state.evict_idle().await;
    }
}
