//! Flowdoctor CLI entry point.

use clap::Parser;
use flowdoctor_core::{config, Settings};
use tracing_subscriber::{fmt, EnvFilter};

use flowdoctor::cli::Cli;
use flowdoctor::commands;

#[tokio::main]
async fn main() {
    config::load_env();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    fmt().with_env_filter(filter).with_target(false).init();

    if let Err(e) = config::ensure_all_dirs() {
        tracing::warn!(error = %e, "Failed to create config directory");
    }

    let mut settings = Settings::from_env();
    if let Some(api_url) = &cli.api_url {
        settings.api_url = api_url.trim_end_matches('/').to_string();
    }

    if let Err(e) = commands::execute(cli.command, &settings).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
