use crate::config::{AppSettings, HandlerConfig};
use crate::context::RuntimeContext;
use crate::embed::build_embeds;
use crate::fields::build_fields;
use crate::payload::{assemble, WebhookPayload};
use crate::record::LogRecord;
use crate::sink::WebhookSink;
use std::sync::Arc;

/// Target of the handler's own diagnostics. The layer never forwards it.
pub const DIAGNOSTIC_TARGET: &str = "tracing_discord_sink::diagnostics";

/// Turns records into Discord payloads and delivers them, best effort.
#[derive(Clone)]
pub struct DiscordHandler {
    config: HandlerConfig,
    app: AppSettings,
    sink: Arc<dyn WebhookSink>,
}

impl DiscordHandler {
    pub fn new(config: HandlerConfig, app: AppSettings, sink: Arc<dyn WebhookSink>) -> Self {
        Self { config, app, sink }
    }

    /// Handler posting through [`HttpWebhookSink`](crate::webhook::HttpWebhookSink)
    /// with the configured timeout.
    #[cfg(feature = "webhook")]
    pub fn with_http(config: HandlerConfig, app: AppSettings) -> Result<Self, crate::sink::DeliveryError> {
        let sink = crate::webhook::HttpWebhookSink::from_config(&config)?;
        Ok(Self::new(config, app, Arc::new(sink)))
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn app(&self) -> &AppSettings {
        &self.app
    }

    /// Build the full webhook body for one record.
    ///
    /// Pure apart from what `ctx` already captured, so the same record and
    /// context always give the same payload.
    pub fn build_payload(&self, record: &LogRecord, ctx: &RuntimeContext) -> WebhookPayload {
        let fields = build_fields(record, ctx, &self.config, &self.app);
        let embeds = build_embeds(record, fields, &self.config, &self.app);
        assemble(embeds, &self.config)
    }

    /// Deliver one record. Never fails: without a webhook this is a no-op,
    /// and delivery errors are only reported locally in debug mode.
    pub async fn deliver(&self, record: &LogRecord, ctx: &RuntimeContext) {
        let Some(url) = self.config.webhook_url() else {
            return;
        };

        let payload = self.build_payload(record, ctx);
        if let Err(e) = self.sink.post(url, &payload).await {
            if self.app.debug {
                tracing::warn!(target: DIAGNOSTIC_TARGET, error = %e, "Discord logger error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Severity;
    use crate::sink::DeliveryError;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        posts: Mutex<Vec<(String, WebhookPayload)>>,
        fail: bool,
    }

    #[async_trait]
    impl WebhookSink for RecordingSink {
        async fn post(&self, url: &str, payload: &WebhookPayload) -> Result<(), DeliveryError> {
            self.posts.lock().unwrap().push((url.to_string(), payload.clone()));
            if self.fail {
                Err(DeliveryError::Transport("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn disk_full() -> LogRecord {
        LogRecord::new(Severity::Error, "disk full")
            .with_channel("app")
            .with_timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .with_context("userId", "u1")
    }

    fn handler(config: HandlerConfig, sink: Arc<RecordingSink>) -> DiscordHandler {
        DiscordHandler::new(config, AppSettings::default(), sink)
    }

    #[tokio::test]
    async fn delivers_error_payload() {
        let sink = Arc::new(RecordingSink::default());
        let config = HandlerConfig::default().with_webhook("https://discord.test/hook");
        let handler = handler(config, sink.clone());

        handler.deliver(&disk_full(), &RuntimeContext::new("production")).await;

        let posts = sink.posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        let (url, payload) = &posts[0];
        assert_eq!(url, "https://discord.test/hook");
        let embed = &payload.embeds[0];
        assert_eq!(embed.title, "❌ Error Log");
        assert_eq!(embed.color, 0xE74C3C);
        assert!(embed.fields.iter().any(|f| f.name == "👤 User ID" && f.value == "u1"));
    }

    #[tokio::test]
    async fn no_webhook_means_no_post() {
        let sink = Arc::new(RecordingSink::default());
        let handler = handler(HandlerConfig::default(), sink.clone());

        for _ in 0..5 {
            handler.deliver(&disk_full(), &RuntimeContext::new("production")).await;
        }
        assert!(sink.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failures_are_contained() {
        let sink = Arc::new(RecordingSink { fail: true, ..RecordingSink::default() });
        let config = HandlerConfig::default().with_webhook("https://discord.test/hook");
        let app = AppSettings { debug: true, ..AppSettings::default() };
        let handler = DiscordHandler::new(config, app, sink.clone());

        handler.deliver(&disk_full(), &RuntimeContext::new("production")).await;
        assert_eq!(sink.posts.lock().unwrap().len(), 1);
    }

    #[test]
    fn payload_is_deterministic() {
        let config = HandlerConfig { context: true, ..HandlerConfig::default() };
        let handler = handler(config, Arc::new(RecordingSink::default()));
        let record = disk_full().with_extra("pid", 4242);
        let ctx = RuntimeContext::new("production").with_memory_usage(123_456);

        let a = serde_json::to_string(&handler.build_payload(&record, &ctx)).unwrap();
        let b = serde_json::to_string(&handler.build_payload(&record, &ctx)).unwrap();
        assert_eq!(a, b);
        assert_eq!(handler.build_payload(&record, &ctx).embeds.len(), 2);
    }
}
