use crate::config::HandlerConfig;
use crate::payload::WebhookPayload;
use crate::sink::{DeliveryError, WebhookSink};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;

/// `User-Agent` sent with every webhook request.
pub const USER_AGENT: &str = concat!("tracing-discord-sink/", env!("CARGO_PKG_VERSION"));

/// Discord webhook transport over HTTP.
#[derive(Clone)]
pub struct HttpWebhookSink {
    client: Client,
}

impl HttpWebhookSink {
    /// Construct a sink whose requests give up after `timeout`.
    ///
    /// **Returns**
    /// - A ready-to-use [`HttpWebhookSink`] that can be handed to
    ///   [`DiscordHandler`](crate::handler::DiscordHandler).
    /// - `Err(..)` if the TLS backend could not be initialised.
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DeliveryError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &HandlerConfig) -> Result<Self, DeliveryError> {
        Self::new(config.timeout())
    }
}

#[async_trait]
impl WebhookSink for HttpWebhookSink {
    async fn post(&self, url: &str, payload: &WebhookPayload) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(payload)?;
        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(DeliveryError::Status { status, body })
        }
    }
}
