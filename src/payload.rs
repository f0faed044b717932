use crate::config::HandlerConfig;
use crate::embed::Embed;
use serde::Serialize;

/// Body POSTed to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookPayload {
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl WebhookPayload {
    /// Message-only payload without embeds.
    pub fn text(content: impl Into<String>) -> Self {
        WebhookPayload {
            embeds: Vec::new(),
            content: Some(content.into()),
        }
    }
}

/// Wrap the embeds, adding the configured top-level message if any.
pub fn assemble(embeds: Vec<Embed>, config: &HandlerConfig) -> WebhookPayload {
    WebhookPayload {
        embeds,
        content: config.message.clone().filter(|m| !m.is_empty()),
    }
}
