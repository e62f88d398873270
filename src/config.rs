//! Configuration loading and validation.
//!
//! FasilBot reads a single human-owned `config.toml`. Secrets never live in
//! it: the file only names the environment variables that hold them, and the
//! values come from the runtime `.env` (see [`crate::credentials`]).

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bot identity settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Telegram channel configuration.
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Completion provider settings.
    #[serde(default)]
    pub models: ModelsConfig,

    /// Spreadsheet store holding the user directory and reports.
    pub sheets: SheetsConfig,

    /// Remote recap endpoint.
    pub recap: RecapConfig,

    /// Persona prompt parameters.
    #[serde(default)]
    pub persona: PersonaConfig,
}

/// Bot identity settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Name the assistant introduces itself with.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Register unknown senders on their first free-text message.
    #[serde(default = "default_true")]
    pub auto_register_on_chat: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            auto_register_on_chat: true,
        }
    }
}

/// Channel configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelsConfig {
    /// Telegram bot settings.
    #[serde(default)]
    pub telegram: TelegramConfig,
}

/// Telegram-specific configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Environment variable name holding the bot token.
    #[serde(default = "default_telegram_token_env")]
    pub bot_token_env: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token_env: default_telegram_token_env(),
        }
    }
}

/// Completion provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Model spec in `<provider>/<model>` form (e.g. "openai/gpt-3.5-turbo").
    #[serde(default = "default_model")]
    pub default: String,

    /// Environment variable name holding the provider API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,

    /// Optional cap on completion tokens.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_openai_base_url(),
            timeout_secs: default_model_timeout(),
            max_tokens: None,
        }
    }
}

/// Google Sheets store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    /// Spreadsheet ID (the long token in the sheet URL).
    pub spreadsheet_id: String,

    /// Path to the service account JSON key. Relative paths resolve against
    /// the runtime directory.
    #[serde(default = "default_service_account_path")]
    pub service_account_path: PathBuf,

    /// Worksheet holding the user directory.
    #[serde(default = "default_user_worksheet")]
    pub user_worksheet: String,

    /// Worksheet holding submitted reports.
    #[serde(default = "default_report_worksheet")]
    pub report_worksheet: String,

    /// Header names used to locate columns.
    #[serde(default)]
    pub columns: ColumnsConfig,
}

/// Worksheet header names.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnsConfig {
    /// Directory column holding the sender identifier.
    #[serde(default = "default_col_identifier")]
    pub identifier: String,
    /// Column holding the facilitator name (directory and reports).
    #[serde(default = "default_col_name")]
    pub name: String,
    /// Report date column.
    #[serde(default = "default_col_date")]
    pub date: String,
    /// Report participant count column.
    #[serde(default = "default_col_participants")]
    pub participants: String,
    /// Report validation status column.
    #[serde(default = "default_col_validation")]
    pub validation: String,
    /// Report remark column.
    #[serde(default = "default_col_remark")]
    pub remark: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            identifier: default_col_identifier(),
            name: default_col_name(),
            date: default_col_date(),
            participants: default_col_participants(),
            validation: default_col_validation(),
            remark: default_col_remark(),
        }
    }
}

/// Remote recap endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RecapConfig {
    /// Endpoint receiving the recap `POST`.
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_recap_timeout")]
    pub timeout_secs: u64,
}

/// Persona prompt parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonaConfig {
    /// Form where facilitators submit activity reports.
    #[serde(default = "default_report_form_url")]
    pub report_form_url: String,

    /// Form where facilitators upload activity documentation.
    #[serde(default = "default_documentation_form_url")]
    pub documentation_form_url: String,

    /// Who facilitators should ask about compensation timing.
    #[serde(default = "default_escalation_contact")]
    pub escalation_contact: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            report_form_url: default_report_form_url(),
            documentation_form_url: default_documentation_form_url(),
            escalation_contact: default_escalation_contact(),
        }
    }
}

// Default value functions for serde

fn default_true() -> bool {
    true
}
fn default_bot_name() -> String {
    "FasilBot".to_owned()
}
fn default_telegram_token_env() -> String {
    "TELEGRAM_TOKEN".to_owned()
}
fn default_model() -> String {
    "openai/gpt-3.5-turbo".to_owned()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_owned()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com".to_owned()
}
fn default_model_timeout() -> u64 {
    60
}
fn default_service_account_path() -> PathBuf {
    PathBuf::from("service-account.json")
}
fn default_user_worksheet() -> String {
    "UserList".to_owned()
}
fn default_report_worksheet() -> String {
    "Laporan".to_owned()
}
fn default_col_identifier() -> String {
    "Chat ID".to_owned()
}
fn default_col_name() -> String {
    "Nama Fasilitator".to_owned()
}
fn default_col_date() -> String {
    "Tanggal".to_owned()
}
fn default_col_participants() -> String {
    "Total Peserta".to_owned()
}
fn default_col_validation() -> String {
    "Validasi".to_owned()
}
fn default_col_remark() -> String {
    "Keterangan".to_owned()
}
fn default_recap_timeout() -> u64 {
    30
}
fn default_report_form_url() -> String {
    "https://forms.example.org/laporan-kegiatan".to_owned()
}
fn default_documentation_form_url() -> String {
    "https://forms.example.org/dokumentasi-kegiatan".to_owned()
}
fn default_escalation_contact() -> String {
    "koordinator wilayah".to_owned()
}

/// Read, parse and validate `config.toml`.
///
/// # Errors
///
/// Returns an error if the file is unreadable, is not valid TOML for
/// [`Config`], or fails [`validate`].
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    let config: Config =
        toml::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))?;
    validate(&config).with_context(|| format!("rejected config {}", path.display()))?;
    Ok(config)
}

/// Reject configurations that would only fail later at request time.
///
/// # Errors
///
/// Returns an error naming the first invalid field.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    if config.sheets.spreadsheet_id.trim().is_empty() {
        anyhow::bail!("sheets.spreadsheet_id must not be empty");
    }
    url::Url::parse(&config.recap.url)
        .map_err(|e| anyhow::anyhow!("recap.url is not a valid URL: {e}"))?;
    url::Url::parse(&config.models.base_url)
        .map_err(|e| anyhow::anyhow!("models.base_url is not a valid URL: {e}"))?;
    if config.recap.timeout_secs == 0 || config.models.timeout_secs == 0 {
        anyhow::bail!("timeouts must be at least one second");
    }
    Ok(())
}

/// Resolve the default config directory (`~/.fasilbot/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".fasilbot"))
        .ok_or_else(|| anyhow::anyhow!("no home directory for the current user"))
}

/// Filesystem locations used at runtime.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    /// Root directory (`~/.fasilbot`).
    pub root: PathBuf,
    /// Human-owned `config.toml`.
    pub config_toml: PathBuf,
    /// Secrets file loaded with dotenvy.
    pub env_file: PathBuf,
    /// Rotated JSON log files.
    pub logs_dir: PathBuf,
}

impl RuntimePaths {
    /// Derive all runtime paths from a root directory.
    pub fn from_root(root: PathBuf) -> Self {
        Self {
            config_toml: root.join("config.toml"),
            env_file: root.join(".env"),
            logs_dir: root.join("logs"),
            root,
        }
    }

    /// Runtime paths rooted at the directory holding `config_file`, so an
    /// explicit `--config` brings its own `.env`, `logs/` and key files.
    pub fn for_config_file(config_file: &Path) -> Self {
        let root = match config_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            config_toml: config_file.to_path_buf(),
            ..Self::from_root(root)
        }
    }

    /// Resolve a possibly relative path against the runtime root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Resolve runtime paths under `~/.fasilbot/`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn runtime_paths() -> anyhow::Result<RuntimePaths> {
    Ok(RuntimePaths::from_root(config_dir()?))
}

/// Runtime paths for an explicit config file, or the `~/.fasilbot/` layout
/// when none is given.
///
/// # Errors
///
/// Returns an error if no file is given and the home directory cannot be
/// determined.
pub fn runtime_paths_for(config_file: Option<&Path>) -> anyhow::Result<RuntimePaths> {
    match config_file {
        Some(path) => Ok(RuntimePaths::for_config_file(path)),
        None => runtime_paths(),
    }
}
