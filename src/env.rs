/// Environment variable names used by this crate for convenient
/// configuration of the Discord handler from services.
///
/// These are purely helpers; the handler itself only sees
/// [`HandlerConfig`](crate::config::HandlerConfig) values.

/// Discord webhook URL. Absent or empty disables delivery.
pub const DISCORD_WEBHOOK_URL_ENV: &str = "DISCORD_WEBHOOK_URL";

/// Minimum forwarded level, e.g. `error`.
pub const DISCORD_LOG_LEVEL_ENV: &str = "DISCORD_LOG_LEVEL";

/// Literal message posted above the embeds.
pub const DISCORD_MESSAGE_ENV: &str = "DISCORD_MESSAGE";

/// `true` to attach the raw context embed.
pub const DISCORD_INCLUDE_CONTEXT_ENV: &str = "DISCORD_INCLUDE_CONTEXT";

/// Footer text; defaults to the application name.
pub const DISCORD_LOG_SUFFIX_ENV: &str = "DISCORD_LOG_SUFFIX";

/// Comma-separated list of environments where delivery is active.
pub const DISCORD_LOG_ENVIRONMENTS_ENV: &str = "DISCORD_LOG_ENVIRONMENTS";

pub const DISCORD_MAX_FIELD_LENGTH_ENV: &str = "DISCORD_MAX_FIELD_LENGTH";

pub const DISCORD_MAX_DESCRIPTION_LENGTH_ENV: &str = "DISCORD_MAX_DESCRIPTION_LENGTH";

/// HTTP timeout in seconds.
pub const DISCORD_TIMEOUT_SECS_ENV: &str = "DISCORD_TIMEOUT_SECS";

/// Application display name.
pub const APP_NAME_ENV: &str = "APP_NAME";

/// Current deployment environment, e.g. `production`.
pub const APP_ENV_ENV: &str = "APP_ENV";

/// Enables local reporting of delivery failures.
pub const APP_DEBUG_ENV: &str = "APP_DEBUG";

/// Prefix stripped from error origin paths.
pub const APP_BASE_PATH_ENV: &str = "APP_BASE_PATH";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

/// Read an environment variable, treating empty values as absent.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Interpret `1`, `true`, `yes` and `on` (any case) as enabled.
pub fn env_flag(key: &str) -> bool {
    env_opt(key).is_some_and(|v| parse_flag(&v))
}

pub(crate) fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
