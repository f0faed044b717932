use std::sync::Arc;

use tracing_discord_sink::config::{AppSettings, HandlerConfig};
use tracing_discord_sink::sink::WebhookSink;
use tracing_discord_sink::status::{check, ping};
use tracing_discord_sink::webhook::HttpWebhookSink;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Discord Logger Status Check");
    println!("=============================");

    let config = HandlerConfig::from_env()?;
    let app = AppSettings::from_env();

    let report = check(&config, &app);
    println!("{report}");

    if report.webhook_configured {
        let sink: Arc<dyn WebhookSink> = Arc::new(HttpWebhookSink::from_config(&config)?);
        match ping(sink.as_ref(), &config, chrono::Utc::now()).await {
            Ok(()) => println!("✅ Webhook is reachable and working"),
            Err(e) => {
                println!("❌ Webhook connectivity failed: {e}");
                std::process::exit(1);
            }
        }
    }

    if !report.is_ready() {
        std::process::exit(1);
    }
    Ok(())
}
