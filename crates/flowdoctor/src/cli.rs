//! Command-line interface definition using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use flowdoctor_api::config::DEFAULT_PORT;

/// Flowdoctor - diagnose failed automation runs
#[derive(Parser, Debug)]
#[command(name = "flowdoctor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Automation API endpoint (overrides FLOWDOCTOR_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Diagnose the latest execution of an automation
    Diagnose {
        /// Automation ID or URL
        #[arg(required_unless_present = "file")]
        reference: Option<String>,

        /// Read the automation from a JSON file instead of the API
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Ask the assistant to explain the diagnosis
        #[arg(short, long)]
        explain: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show run statistics for an automation
    Summary {
        /// Automation ID or URL
        #[arg(required_unless_present = "file")]
        reference: Option<String>,

        /// Read the automation from a JSON file instead of the API
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Run the HTTP debug API
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Allowed CORS origin (repeatable; default allows any)
        #[arg(long = "cors-origin")]
        cors_origins: Vec<String>,
    },

    /// Run the Telegram debug bot
    Bot,
}

/// Output format for one-shot commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain-text report
    #[default]
    Text,
    /// Telegram-style HTML report
    Html,
    /// JSON document
    Json,
}

impl Cli {
    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
