//! Shared configuration for flowdoctor.
//!
//! Locates the state directory and reads runtime settings from the
//! environment.
//!
//! # Storage Structure
//!
//! ```text
//! ~/.flowdoctor/
//! └── config/       # .env.local with secrets
//! ```
//!
//! # Environment Variables
//!
//! - `FLOWDOCTOR_STATE_DIR`: Override the base state directory
//! - `FLOWDOCTOR_CONFIG_DIR`: Override the config directory
//! - `FLOWDOCTOR_API_URL`: Automations endpoint of the platform API
//! - `FLOWDOCTOR_API_PASSWORD`: Shared secret sent as `?password=`
//! - `FLOWDOCTOR_GUIDE_PATH`: Debugging guide handed to the assistant
//! - `FLOWDOCTOR_SESSION_TTL_SECS`: Idle time before a chat session is dropped
//! - `OPENROUTER_API_KEY`, `OPENROUTER_MODEL`, `OPENROUTER_BASE_URL`
//! - `TELEGRAM_BOT_TOKEN`

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use tracing::debug;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "FLOWDOCTOR_STATE_DIR";

/// Environment variable for custom config directory.
pub const CONFIG_DIR_ENV: &str = "FLOWDOCTOR_CONFIG_DIR";

pub const API_URL_ENV: &str = "FLOWDOCTOR_API_URL";
pub const API_PASSWORD_ENV: &str = "FLOWDOCTOR_API_PASSWORD";
pub const GUIDE_PATH_ENV: &str = "FLOWDOCTOR_GUIDE_PATH";
pub const SESSION_TTL_ENV: &str = "FLOWDOCTOR_SESSION_TTL_SECS";
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const OPENROUTER_MODEL_ENV: &str = "OPENROUTER_MODEL";
pub const OPENROUTER_BASE_URL_ENV: &str = "OPENROUTER_BASE_URL";
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Default automations endpoint.
pub const DEFAULT_API_URL: &str = "https://pulseflow.co/api/automations";

/// Default model for the chat-completion backend.
pub const DEFAULT_OPENROUTER_MODEL: &str = "anthropic/claude-sonnet-4";

/// Default OpenRouter API base.
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default idle time before a chat session is evicted.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

const DEFAULT_STATE_DIR: &str = ".flowdoctor";
const CONFIG_SUBDIR: &str = "config";

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Get the flowdoctor state directory.
///
/// The state directory is determined by:
/// 1. `FLOWDOCTOR_STATE_DIR` environment variable if set
/// 2. `~/.flowdoctor` if home directory is available
/// 3. `.flowdoctor` in current directory as fallback
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| {
            std::env::var(STATE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    dirs::home_dir()
                        .map(|h| h.join(DEFAULT_STATE_DIR))
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
                })
        })
        .clone()
}

/// Get the user config directory.
///
/// Defaults to `~/.flowdoctor/config/` or `FLOWDOCTOR_CONFIG_DIR` env var.
pub fn config_dir() -> PathBuf {
    std::env::var(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| state_dir().join(CONFIG_SUBDIR))
}

/// Get the .env.local file path.
///
/// Environment file for secrets (API password, tokens).
pub fn env_file() -> PathBuf {
    config_dir().join(".env.local")
}

/// Ensure the config directory exists.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_all_dirs() -> std::io::Result<()> {
    std::fs::create_dir_all(config_dir())
}

/// Load environment files into the process environment.
///
/// The config-dir `.env.local` is loaded first, then `.env.local` and `.env`
/// from the working directory. Variables already set are never overwritten.
pub fn load_env() {
    let global = env_file();
    if global.exists() {
        match dotenvy::from_path(&global) {
            Ok(()) => debug!(path = %global.display(), "Loaded environment file"),
            Err(e) => debug!(path = %global.display(), error = %e, "Skipped environment file"),
        }
    }
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
}

/// Runtime settings shared by the CLI, the API server and the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub api_password: Option<String>,
    pub guide_path: Option<PathBuf>,
    pub openrouter_api_key: Option<String>,
    pub openrouter_model: String,
    pub openrouter_base_url: String,
    pub telegram_bot_token: Option<String>,
    pub session_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_password: None,
            guide_path: None,
            openrouter_api_key: None,
            openrouter_model: DEFAULT_OPENROUTER_MODEL.to_string(),
            openrouter_base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            telegram_bot_token: None,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let session_ttl = get(SESSION_TTL_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.session_ttl);

        Self {
            api_url: get(API_URL_ENV)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            api_password: get(API_PASSWORD_ENV),
            guide_path: get(GUIDE_PATH_ENV).map(|p| expand_path(&p)),
            openrouter_api_key: get(OPENROUTER_API_KEY_ENV),
            openrouter_model: get(OPENROUTER_MODEL_ENV).unwrap_or(defaults.openrouter_model),
            openrouter_base_url: get(OPENROUTER_BASE_URL_ENV)
                .unwrap_or(defaults.openrouter_base_url),
            telegram_bot_token: get(TELEGRAM_TOKEN_ENV),
            session_ttl,
        }
    }

    /// Whether a chat-completion backend can be built.
    pub fn assistant_enabled(&self) -> bool {
        self.openrouter_api_key.is_some()
    }
}

/// Expand a leading `~` in a path.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw.trim()).into_owned())
}
