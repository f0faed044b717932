use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::error;

use tracing_discord_sink::config::{AppSettings, HandlerConfig};
use tracing_discord_sink::handler::DiscordHandler;
use tracing_discord_sink::init::{init_tracing_with_config, LayerConfig};
use tracing_discord_sink::noop_sink::NoopSink;

#[tokio::main]
async fn main() {
    let config = HandlerConfig::default().with_webhook("https://discord.invalid/api/webhooks/0/load");
    let handler = DiscordHandler::new(config, AppSettings::default(), Arc::new(NoopSink));

    let layer_config = LayerConfig {
        channel_buffer: 50_000,
        enable_stdout: false,
    };
    if let Err(e) = init_tracing_with_config(handler, layer_config) {
        eprintln!("failed to install subscriber: {e}");
        return;
    }

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Give background task a little time to drain the channel
    sleep(Duration::from_secs(2)).await;
}
