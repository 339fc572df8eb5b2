//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.dfbridge/config.json`) and environment.
//! Secrets (service-account email and key, Telegram token) may come from env instead of the file.
//!
//! The private key may be stored with literal `\n` sequences (as copied out of a
//! service-account JSON file) or with real newlines; both are accepted and
//! normalized to real newlines before the key is used.

use crate::dialogflow::Capabilities;
use crate::language::LanguageCode;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Dialogflow CX agent and service account.
    #[serde(default)]
    pub dialogflow: DialogflowConfig,

    /// Channel settings (e.g. Telegram).
    #[serde(default)]
    pub channels: ChannelsConfig,
}

/// Dialogflow CX agent settings as stored in the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogflowConfig {
    pub project_id: Option<String>,
    pub agent_id: Option<String>,
    /// Region of the agent (e.g. "us-central1", "europe-west2", "global").
    pub location: Option<String>,
    /// Default language tag (e.g. "en", "DE"). Unset or empty means English.
    pub default_language: Option<String>,
    /// Service account email. Overridden by DIALOGFLOW_CLIENT_EMAIL env.
    pub client_email: Option<String>,
    /// Service account PEM key. Overridden by DIALOGFLOW_PRIVATE_KEY env.
    pub private_key: Option<String>,
    /// Which optional behaviors the dispatcher enables (events, rich cards, session echo).
    #[serde(default)]
    pub capabilities: Capabilities,
}

/// Per-channel config (e.g. Telegram bot token).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramChannelConfig,
}

/// Telegram channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramChannelConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    pub bot_token: Option<String>,
    /// Event sent to the agent for `/start` (requires the events capability). Unset: `/start` is sent as text.
    pub start_event: Option<String>,
    /// Text sent when the agent requests a handoff to a human.
    pub handoff_message: Option<String>,
    /// Text sent when the agent closes the conversation.
    pub close_message: Option<String>,
}

/// Settings read for each Dialogflow call. Required values are plain strings and may be empty;
/// the dispatcher reports which one is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogflowSettings {
    pub project_id: String,
    pub agent_id: String,
    pub location: String,
    pub default_language: Option<LanguageCode>,
    pub client_email: String,
    pub private_key: String,
}

impl DialogflowSettings {
    /// Configured language, or English when unset.
    pub fn language(&self) -> LanguageCode {
        self.default_language.unwrap_or_default()
    }
}

/// Source of Dialogflow settings, consulted on every call so edits take effect on the next request.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn settings(&self) -> Result<DialogflowSettings>;
}

/// Fixed settings (tests, embedding applications that manage their own config).
#[derive(Debug, Clone)]
pub struct StaticSettings(pub DialogflowSettings);

#[async_trait]
impl SettingsSource for StaticSettings {
    async fn settings(&self) -> Result<DialogflowSettings> {
        Ok(self.0.clone())
    }
}

/// Re-reads the config file (and env overrides) on every call.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: path.unwrap_or_else(default_config_path),
        }
    }
}

#[async_trait]
impl SettingsSource for FileSettings {
    async fn settings(&self) -> Result<DialogflowSettings> {
        let (config, _) = load_config(Some(self.path.clone()))?;
        Ok(dialogflow_settings(&config))
    }
}

/// Trimmed, non-empty env var.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn config_value(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the service account email: env DIALOGFLOW_CLIENT_EMAIL overrides config.
pub fn resolve_client_email(config: &Config) -> Option<String> {
    env_value("DIALOGFLOW_CLIENT_EMAIL").or_else(|| config_value(&config.dialogflow.client_email))
}

/// Resolve the service account key: env DIALOGFLOW_PRIVATE_KEY overrides config.
pub fn resolve_private_key(config: &Config) -> Option<String> {
    env_value("DIALOGFLOW_PRIVATE_KEY").or_else(|| config_value(&config.dialogflow.private_key))
}

/// Resolve the Telegram bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_telegram_token(config: &Config) -> Option<String> {
    env_value("TELEGRAM_BOT_TOKEN").or_else(|| config_value(&config.channels.telegram.bot_token))
}

/// Parse the configured language; empty means unset, unknown tags fall back to English with a warning.
pub fn resolve_language(config: &Config) -> Option<LanguageCode> {
    let raw = config_value(&config.dialogflow.default_language)?;
    match raw.parse() {
        Ok(code) => Some(code),
        Err(e) => {
            log::warn!("{}; using {}", e, LanguageCode::default());
            None
        }
    }
}

/// Build per-call settings from config and env. Missing values become empty strings.
pub fn dialogflow_settings(config: &Config) -> DialogflowSettings {
    let df = &config.dialogflow;
    DialogflowSettings {
        project_id: config_value(&df.project_id).unwrap_or_default(),
        agent_id: config_value(&df.agent_id).unwrap_or_default(),
        location: config_value(&df.location).unwrap_or_default(),
        default_language: resolve_language(config),
        client_email: resolve_client_email(config).unwrap_or_default(),
        private_key: resolve_private_key(config).unwrap_or_default(),
    }
}

/// Turn literal `\n` sequences into newlines. Keys that already contain real newlines are unchanged.
pub fn normalize_private_key(key: &str) -> String {
    key.replace("\\n", "\n")
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("DFBRIDGE_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".dfbridge").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path (or the default). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
