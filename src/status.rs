//! Configuration diagnostics: whether delivery would happen in the current
//! environment, and a connectivity ping against the webhook.

use crate::config::{AppSettings, HandlerConfig};
use crate::level::Severity;
use crate::payload::WebhookPayload;
use crate::sink::{DeliveryError, WebhookSink};
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub webhook_configured: bool,
    pub level: Severity,
    pub environment: String,
    pub environments: Vec<String>,
    /// Current environment is in the activation list.
    pub active: bool,
}

impl StatusReport {
    /// An inactive environment is expected during development and does
    /// not make the setup unusable.
    pub fn is_ready(&self) -> bool {
        self.webhook_configured
    }
}

pub fn check(config: &HandlerConfig, app: &AppSettings) -> StatusReport {
    StatusReport {
        webhook_configured: config.webhook_url().is_some(),
        level: config.level,
        environment: app.environment.clone(),
        environments: config.environment.clone(),
        active: config.is_active_in(&app.environment),
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.webhook_configured {
            writeln!(f, "✅ Webhook URL configured")?;
        } else {
            writeln!(f, "❌ Webhook URL not configured (set DISCORD_WEBHOOK_URL)")?;
        }
        writeln!(f, "ℹ️  Log level: {}", self.level)?;
        writeln!(f, "ℹ️  Current environment: {}", self.environment)?;
        writeln!(f, "ℹ️  Configured environments: {}", self.environments.join(", "))?;
        if self.active {
            write!(f, "✅ Discord logging is enabled for current environment")
        } else {
            write!(f, "⚠️  Discord logging is disabled for current environment")
        }
    }
}

/// Post a plain connectivity message to the configured webhook.
pub async fn ping(
    sink: &dyn WebhookSink,
    config: &HandlerConfig,
    now: DateTime<Utc>,
) -> Result<(), DeliveryError> {
    let url = config.webhook_url().ok_or(DeliveryError::NotConfigured)?;
    let payload = WebhookPayload::text(format!(
        "🏓 Discord logger connectivity test - {}",
        now.format("%Y-%m-%d %H:%M:%S")
    ));
    sink.post(url, &payload).await
}
