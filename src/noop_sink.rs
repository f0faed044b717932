use crate::payload::WebhookPayload;
use crate::sink::{DeliveryError, WebhookSink};
use async_trait::async_trait;

/// A sink that simply drops all payloads.
///
/// Useful for measuring the overhead of the layer and the payload builders
/// without any network I/O.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl WebhookSink for NoopSink {
    async fn post(&self, _url: &str, _payload: &WebhookPayload) -> Result<(), DeliveryError> {
        Ok(())
    }
}
