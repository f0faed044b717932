use chrono::{TimeZone, Utc};
use mockito::{Matcher, Server};
use std::sync::Arc;
use std::time::Duration;
use tracing_discord_sink::config::{AppSettings, HandlerConfig};
use tracing_discord_sink::context::RuntimeContext;
use tracing_discord_sink::handler::DiscordHandler;
use tracing_discord_sink::level::Severity;
use tracing_discord_sink::payload::WebhookPayload;
use tracing_discord_sink::record::LogRecord;
use tracing_discord_sink::sink::{DeliveryError, WebhookSink};
use tracing_discord_sink::webhook::{HttpWebhookSink, USER_AGENT};

const HOOK_PATH: &str = "/api/webhooks/1/token";

fn disk_full() -> LogRecord {
    LogRecord::new(Severity::Error, "disk full")
        .with_channel("app")
        .with_timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        .with_context("userId", "u1")
}

#[tokio::test]
async fn posts_json_with_headers() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", HOOK_PATH)
        .match_header("content-type", "application/json")
        .match_header("user-agent", USER_AGENT)
        .match_body(Matcher::Json(serde_json::json!({ "embeds": [], "content": "ping" })))
        .with_status(204)
        .create_async()
        .await;

    let sink = HttpWebhookSink::new(Duration::from_secs(5)).expect("client");
    let url = format!("{}{}", server.url(), HOOK_PATH);
    sink.post(&url, &WebhookPayload::text("ping")).await.expect("delivered");

    mock.assert_async().await;
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", HOOK_PATH)
        .with_status(429)
        .with_body("You are being rate limited.")
        .create_async()
        .await;

    let sink = HttpWebhookSink::new(Duration::from_secs(5)).expect("client");
    let url = format!("{}{}", server.url(), HOOK_PATH);
    let err = sink.post(&url, &WebhookPayload::text("ping")).await.unwrap_err();

    match err {
        DeliveryError::Status { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "You are being rate limited.");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn handler_sends_error_embed() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", HOOK_PATH)
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""title":"❌ Error Log""#.to_string()),
            Matcher::Regex(r#""color":15158332"#.to_string()),
            Matcher::Regex(r#""timestamp":"2024-01-01T00:00:00\.000Z""#.to_string()),
            Matcher::Regex(r#"\{"name":"👤 User ID","value":"u1","inline":true\}"#.to_string()),
        ]))
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let config = HandlerConfig::default().with_webhook(format!("{}{}", server.url(), HOOK_PATH));
    let handler = DiscordHandler::with_http(config, AppSettings::default()).expect("client");
    handler.deliver(&disk_full(), &RuntimeContext::new("production")).await;

    mock.assert_async().await;
}

#[tokio::test]
async fn handler_swallows_server_errors() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", HOOK_PATH)
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let config = HandlerConfig::default().with_webhook(format!("{}{}", server.url(), HOOK_PATH));
    let app = AppSettings { debug: true, ..AppSettings::default() };
    let handler = DiscordHandler::with_http(config, app).expect("client");
    handler.deliver(&disk_full(), &RuntimeContext::new("production")).await;

    mock.assert_async().await;
}

#[tokio::test]
async fn unreachable_webhook_is_contained() {
    // Nothing listens on port 9 of localhost.
    let config = HandlerConfig {
        timeout_secs: 1,
        ..HandlerConfig::default()
    }
    .with_webhook("http://127.0.0.1:9/api/webhooks/1/token");
    let sink: Arc<dyn WebhookSink> = Arc::new(HttpWebhookSink::from_config(&config).expect("client"));
    let handler = DiscordHandler::new(config, AppSettings::default(), sink);

    handler.deliver(&disk_full(), &RuntimeContext::new("production")).await;
}
