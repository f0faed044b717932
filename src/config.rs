use crate::env::{self, env_opt};
use crate::level::{Severity, UnknownSeverity};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

pub const DEFAULT_MAX_FIELD_LENGTH: usize = 1024;
pub const DEFAULT_MAX_DESCRIPTION_LENGTH: usize = 4000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_ENVIRONMENT: &str = "production";
pub const DEFAULT_FOOTER_ICON_URL: &str = "https://www.rust-lang.org/static/images/favicon-32x32.png";

/// Options of a Discord logging channel, fixed for the lifetime of the
/// handler.
///
/// Deserializable from the host's configuration; unspecified keys take
/// the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Destination webhook. `None` (or empty) disables delivery.
    pub webhook: Option<String>,
    /// Minimum level forwarded to Discord.
    pub level: Severity,
    /// Literal top-level message posted with every payload.
    pub message: Option<String>,
    /// Attach a second embed with the raw context and extra data.
    pub context: bool,
    /// Footer text; falls back to the application name.
    pub suffix: Option<String>,
    /// Environments in which the handler is attached.
    #[serde(deserialize_with = "one_or_many")]
    pub environment: Vec<String>,
    pub max_field_length: usize,
    pub max_description_length: usize,
    pub timeout_secs: u64,
    pub footer_icon_url: Option<String>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            webhook: None,
            level: Severity::Debug,
            message: None,
            context: false,
            suffix: None,
            environment: vec![DEFAULT_ENVIRONMENT.to_string()],
            max_field_length: DEFAULT_MAX_FIELD_LENGTH,
            max_description_length: DEFAULT_MAX_DESCRIPTION_LENGTH,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            footer_icon_url: Some(DEFAULT_FOOTER_ICON_URL.to_string()),
        }
    }
}

impl HandlerConfig {
    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.webhook = Some(url.into());
        self
    }

    /// Load the configuration from `DISCORD_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.webhook = env_opt(env::DISCORD_WEBHOOK_URL_ENV);
        if let Some(level) = env_opt(env::DISCORD_LOG_LEVEL_ENV) {
            config.level = level.parse()?;
        }
        config.message = env_opt(env::DISCORD_MESSAGE_ENV).filter(|m| m != "null");
        config.context = env::env_flag(env::DISCORD_INCLUDE_CONTEXT_ENV);
        config.suffix = env_opt(env::DISCORD_LOG_SUFFIX_ENV);
        if let Some(list) = env_opt(env::DISCORD_LOG_ENVIRONMENTS_ENV) {
            config.environment = split_list(&list);
        }
        if let Some(n) = parse_number(env::DISCORD_MAX_FIELD_LENGTH_ENV)? {
            config.max_field_length = n;
        }
        if let Some(n) = parse_number(env::DISCORD_MAX_DESCRIPTION_LENGTH_ENV)? {
            config.max_description_length = n;
        }
        if let Some(n) = parse_number(env::DISCORD_TIMEOUT_SECS_ENV)? {
            config.timeout_secs = n;
        }

        Ok(config)
    }

    /// Configured webhook URL, ignoring blank values.
    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    pub fn is_active_in(&self, environment: &str) -> bool {
        self.environment.iter().any(|e| e == environment)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn footer_suffix<'a>(&'a self, app: &'a AppSettings) -> &'a str {
        self.suffix.as_deref().unwrap_or(&app.name)
    }
}

/// Host application settings the handler depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    /// Display name, used as default footer suffix.
    pub name: String,
    /// Current deployment environment.
    pub environment: String,
    /// Report delivery failures locally.
    pub debug: bool,
    /// Prefix stripped from error origin paths.
    pub base_path: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            debug: false,
            base_path: None,
        }
    }
}

impl AppSettings {
    pub fn new(name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            environment: environment.into(),
            ..Self::default()
        }
    }

    /// Load from `APP_NAME`, `APP_ENV`, `APP_DEBUG` and `APP_BASE_PATH`.
    pub fn from_env() -> Self {
        Self {
            name: env::env_or(env::APP_NAME_ENV, "app"),
            environment: env::env_or(env::APP_ENV_ENV, DEFAULT_ENVIRONMENT),
            debug: env::env_flag(env::APP_DEBUG_ENV),
            base_path: env_opt(env::APP_BASE_PATH_ENV),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    InvalidLevel(#[from] UnknownSeverity),

    #[error("invalid number for {key}: {value:?}")]
    InvalidNumber { key: &'static str, value: String },
}

fn parse_number<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env_opt(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}
