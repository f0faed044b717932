use crate::payload::WebhookPayload;
use async_trait::async_trait;

/// Asynchronous transport for [`WebhookPayload`]s.
///
/// Implementations POST the JSON-encoded payload to `url`. The layer calls
/// `post` from a background task and never awaits it on the application
/// thread.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    /// Deliver a single payload.
    ///
    /// **Returns**
    /// - `Ok(())` if the destination accepted the payload (2xx).
    /// - `Err(..)` on transport failure, timeout or any other status.
    ///   Callers drop the payload; there is no retry.
    async fn post(&self, url: &str, payload: &WebhookPayload) -> Result<(), DeliveryError>;
}

/// Reasons a webhook delivery can fail.
#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error("no webhook url configured")]
    NotConfigured,

    #[error("failed to build http client: {0}")]
    Client(String),

    #[error("webhook request failed: {0}")]
    Transport(String),

    #[error("webhook responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}
