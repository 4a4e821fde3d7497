//! Flowdoctor Telegram Bot binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx cargo run -p flowdoctor-telegram
//! ```

use clap::Parser;
use flowdoctor_core::{config, Settings};
use flowdoctor_telegram::FlowdoctorBot;
use tracing_subscriber::EnvFilter;

/// Flowdoctor Telegram Bot - diagnose failed automations from Telegram
#[derive(Parser, Debug)]
#[command(name = "flowdoctor-telegram")]
#[command(about = "Telegram bot for Flowdoctor - diagnose automation failures in chat")]
struct Args {
    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    config::load_env();

    let filter = match args.verbose {
        0 => "flowdoctor_telegram=info,flowdoctor_core=info,teloxide=warn",
        1 => "flowdoctor_telegram=debug,flowdoctor_core=debug,teloxide=info",
        2 => "flowdoctor_telegram=trace,flowdoctor_core=trace,teloxide=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(filter))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = config::ensure_all_dirs() {
        tracing::warn!(error = %e, "Failed to create config directory");
    }

    let settings = Settings::from_env();
    let bot = FlowdoctorBot::from_settings(&settings)?;

    match bot.get_me().await {
        Ok(username) => {
            tracing::info!(username = %username, "Bot initialized successfully");
            println!("\n[robot] Flowdoctor Telegram Bot");
            println!("   Bot: @{}", username);
            println!("   API: {}", settings.api_url);
            println!(
                "   Assistant: {}",
                if settings.assistant_enabled() { "enabled" } else { "rule-based" }
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to get bot info");
            return Err(e.into());
        }
    }

    println!("\n[phone] Open Telegram and send /start to begin");
    println!("   Press Ctrl+C to stop\n");

    bot.start_polling().await?;

    Ok(())
}
