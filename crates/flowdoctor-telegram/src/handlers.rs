//! Command, message and callback handlers for the Telegram bot.

use std::sync::Arc;

use flowdoctor_core::diagnosis::render::html_escape;
use flowdoctor_core::{parse_automation_ref, render_not_found, AnswerContext, Diagnoser, ReportFormat};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatAction, ParseMode, ReplyMarkup, UserId};
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

use crate::conversation::{classify_callback, Action, ConversationState, Input, MenuItem};
use crate::state::BotState;
use crate::ui::{confirm_keyboard, confirm_prompt, menu_keyboard, split_html, MESSAGE_LIMIT};

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot and show the menu")]
    Start,

    #[command(description = "Show help message")]
    Help,

    #[command(description = "Diagnose an automation: /debug [id or URL]")]
    Debug(String),

    #[command(description = "Forget the current automation and chat history")]
    Reset,

    #[command(description = "Show conversation status")]
    Status,
}

const PROMPT_FOR_ID: &str = "Send me an automation ID or URL.\n\n\
    Example: <code>https://pulseflow.co/automations/cmkwhwr4j0001jp0412bdp8zw</code>";

const INVALID_ID: &str = "❌ That doesn't look like an automation ID or URL.\n\n\
    IDs are 20-30 lowercase letters and digits, e.g. <code>cmkwhwr4j0001jp0412bdp8zw</code>.";

fn welcome_text(assistant_enabled: bool) -> String {
    format!(
        "Welcome to Flowdoctor! 🩺\n\n\
        I diagnose failed automation runs.\n\n\
        <b>Getting Started:</b>\n\
        1. Tap {} or paste an automation URL\n\
        2. Read the diagnosis\n\
        3. Ask follow-up questions with {}\n\
        4. Use {} to start over\n\n\
        <b>Assistant:</b> {}\n\n\
        Type /help for all commands.",
        MenuItem::Debug.label(),
        MenuItem::Ask.label(),
        MenuItem::Reset.label(),
        if assistant_enabled {
            "✅ enabled"
        } else {
            "⚠️ rule-based only (set OPENROUTER_API_KEY)"
        }
    )
}

fn help_text() -> String {
    format!(
        "{}\n\n\
        <b>Menu:</b>\n\
        {} - diagnose an automation\n\
        {} - ask about the current automation\n\
        {} - clear the conversation\n\
        {} - this message\n\n\
        You can also paste an automation ID or URL at any time.",
        html_escape(&Command::descriptions().to_string()),
        MenuItem::Debug.label(),
        MenuItem::Ask.label(),
        MenuItem::Reset.label(),
        MenuItem::Help.label(),
    )
}

fn status_text(conversation: &ConversationState, assistant_enabled: bool, history: usize) -> String {
    let automation = match conversation.automation_id() {
        Some(id) => format!("<code>{}</code>", html_escape(id)),
        None => "none".to_string(),
    };
    format!(
        "📊 <b>Status</b>\n\n\
        💬 Conversation: {}\n\
        🤖 Automation: {}\n\
        📝 History: {} messages\n\
        🧠 Assistant: {}",
        conversation.describe(),
        automation,
        history,
        if assistant_enabled { "enabled" } else { "rule-based" }
    )
}

/// Send HTML text, split into well-formed chunks that fit Telegram's limit.
///
/// The markup is attached to the last chunk.
async fn send_html(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    markup: Option<ReplyMarkup>,
) -> ResponseResult<()> {
    let chunks = split_html(text, MESSAGE_LIMIT);
    let last = chunks.len().saturating_sub(1);
    for (i, chunk) in chunks.into_iter().enumerate() {
        let mut req = bot.send_message(chat_id, chunk).parse_mode(ParseMode::Html);
        if i == last {
            if let Some(markup) = markup.clone() {
                req = req.reply_markup(markup);
            }
        }
        req.await?;
    }
    Ok(())
}

/// Fetch, diagnose and reply for one automation.
async fn diagnose(
    bot: &Bot,
    chat_id: ChatId,
    state: &BotState,
    automation_id: &str,
) -> ResponseResult<()> {
    send_html(
        bot,
        chat_id,
        &format!("🔍 Analyzing automation <code>{}</code>...", html_escape(automation_id)),
        None,
    )
    .await?;
    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;

    let Some(automation) = state.fetch_recent(automation_id).await else {
        warn!(chat_id = %chat_id, automation_id = %automation_id, "Automation not available");
        return send_html(
            bot,
            chat_id,
            &render_not_found(automation_id, ReportFormat::Html),
            None,
        )
        .await;
    };

    let diagnosis = Diagnoser::new().diagnose_latest(&automation);
    info!(
        chat_id = %chat_id,
        automation_id = %automation_id,
        issues = diagnosis.issues.len(),
        severity = %diagnosis.highest_severity(),
        "Diagnosed automation"
    );

    let reply = state
        .assistant()
        .explain_or_fallback(&automation, &diagnosis, ReportFormat::Html)
        .await;
    send_html(bot, chat_id, &reply, None).await
}

/// Answer a free-form question, with the automation as context when known.
async fn answer(
    bot: &Bot,
    chat_id: ChatId,
    state: &BotState,
    automation_id: Option<&str>,
    question: &str,
) -> ResponseResult<()> {
    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;

    let automation = match automation_id {
        Some(id) => match state.fetch_recent(id).await {
            Some(automation) => Some(automation),
            None => {
                return send_html(bot, chat_id, &render_not_found(id, ReportFormat::Html), None)
                    .await;
            }
        },
        None => None,
    };
    let diagnosis = automation
        .as_ref()
        .map(|a| Diagnoser::new().diagnose_latest(a));
    let context = automation
        .as_ref()
        .zip(diagnosis.as_ref())
        .map(|(automation, diagnosis)| AnswerContext {
            automation,
            diagnosis,
        });

    let history = state.history(chat_id.0).await;
    let reply = state
        .assistant()
        .answer_or_fallback(question, context, &history, ReportFormat::Html)
        .await;

    if state.assistant().is_enabled() {
        state.record_exchange(chat_id.0, question, &reply).await;
    }
    debug!(chat_id = %chat_id, automation_id = ?automation_id, "Answered question");
    send_html(bot, chat_id, &reply, None).await
}

/// Carry out what a conversation transition asked for.
pub async fn perform(
    bot: &Bot,
    chat_id: ChatId,
    state: &BotState,
    action: Action,
) -> ResponseResult<()> {
    match action {
        Action::ShowHelp => send_html(bot, chat_id, &help_text(), Some(menu_keyboard().into())).await,
        Action::ShowMenu => {
            send_html(
                bot,
                chat_id,
                "Nothing to reset. Choose an option below.",
                Some(menu_keyboard().into()),
            )
            .await
        }
        Action::PromptForId => send_html(bot, chat_id, PROMPT_FOR_ID, None).await,
        Action::PromptForQuestion { automation_id } => {
            let text = format!(
                "💬 Ask me anything about automation <code>{}</code>.",
                html_escape(&automation_id)
            );
            send_html(bot, chat_id, &text, None).await
        }
        Action::Diagnose { automation_id } => diagnose(bot, chat_id, state, &automation_id).await,
        Action::Answer {
            automation_id,
            question,
        } => answer(bot, chat_id, state, automation_id.as_deref(), &question).await,
        Action::AskConfirmation(purpose) => {
            send_html(
                bot,
                chat_id,
                &confirm_prompt(&purpose),
                Some(confirm_keyboard().into()),
            )
            .await
        }
        Action::ResetDone => {
            send_html(
                bot,
                chat_id,
                "🔄 Conversation reset. Send an automation ID or URL to start again.",
                Some(menu_keyboard().into()),
            )
            .await
        }
        Action::Cancelled => send_html(bot, chat_id, "Cancelled.", None).await,
        Action::InvalidId => send_html(bot, chat_id, INVALID_ID, None).await,
        Action::Stale => {
            send_html(bot, chat_id, "This confirmation has expired.", None).await
        }
    }
}

/// Handle the /start command.
pub async fn handle_start(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let welcome = welcome_text(state.assistant().is_enabled());
    send_html(&bot, msg.chat.id, &welcome, Some(menu_keyboard().into())).await?;

    info!(chat_id = %msg.chat.id, user = ?msg.from.as_ref().map(|u| &u.username), "User started bot");
    Ok(())
}

/// Handle the /debug command.
pub async fn handle_debug(
    bot: Bot,
    msg: Message,
    state: Arc<BotState>,
    reference: String,
) -> ResponseResult<()> {
    let reference = reference.trim();
    let input = if reference.is_empty() {
        Input::Menu(MenuItem::Debug)
    } else {
        match parse_automation_ref(reference) {
            Some(id) => Input::AutomationRef(id),
            None => return perform(&bot, msg.chat.id, &state, Action::InvalidId).await,
        }
    };

    let action = state.apply(msg.chat.id.0, input).await;
    perform(&bot, msg.chat.id, &state, action).await
}

/// Handle the /status command.
pub async fn handle_status(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    let conversation = state.conversation(chat_id.0).await;
    let history = state.history(chat_id.0).await.len();
    let status = status_text(&conversation, state.assistant().is_enabled(), history);
    send_html(&bot, chat_id, &status, None).await
}

/// Dispatch commands to appropriate handlers.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => handle_start(bot, msg, state).await,
        Command::Help => {
            let action = state.apply(msg.chat.id.0, Input::Menu(MenuItem::Help)).await;
            perform(&bot, msg.chat.id, &state, action).await
        }
        Command::Debug(reference) => handle_debug(bot, msg, state, reference).await,
        Command::Reset => {
            let action = state.apply(msg.chat.id.0, Input::Menu(MenuItem::Reset)).await;
            perform(&bot, msg.chat.id, &state, action).await
        }
        Command::Status => handle_status(bot, msg, state).await,
    }
}

/// Handle regular text messages and menu buttons.
pub async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let chat_id = msg.chat.id;
    let action = state.apply_text(chat_id.0, text).await;
    perform(&bot, chat_id, &state, action).await
}

/// Handle inline-button presses (confirmations).
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(input) = q.data.as_deref().and_then(classify_callback) else {
        warn!(data = ?q.data, "Unknown callback data");
        return Ok(());
    };

    let chat_id = callback_chat_id(q.message.as_ref().map(|m| m.chat().id), q.from.id);
    let action = state.apply(chat_id.0, input).await;
    perform(&bot, chat_id, &state, action).await
}

/// Chat a button press belongs to: the chat of the message carrying the
/// button, or the pressing user's private chat when that message is gone.
fn callback_chat_id(message_chat: Option<ChatId>, user: UserId) -> ChatId {
    message_chat.unwrap_or_else(|| ChatId::from(user))
}
