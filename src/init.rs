use crate::config::ConfigError;
use crate::handler::DiscordHandler;
use crate::layer::DiscordLayer;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Конфигурация слоя логирования.
///
/// Управляет размером внутреннего буфера и тем, нужно ли дополнительно
/// печатать логи в консоль через `fmt`‑слой.
///
/// **Поля**
/// - `channel_buffer`: максимальное число записей в очереди до начала
///   дропа новых записей.
/// - `enable_stdout`: если `true`, поверх `DiscordLayer` добавляется
///   `tracing_subscriber::fmt::Layer` и события печатаются в консоль.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub channel_buffer: usize,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            enable_stdout: true,
        }
    }
}

/// Build the Discord layer if the handler is active in the current
/// environment.
///
/// **Returns**
/// - `Some(layer)` when `app.environment` is in the configured activation
///   list; the background delivery task is already running.
/// - `None` otherwise. `Option<DiscordLayer>` is itself a layer, so the
///   result can be added to a subscriber either way.
pub fn build_layer(handler: DiscordHandler, config: &LayerConfig) -> Option<DiscordLayer> {
    if !handler.config().is_active_in(&handler.app().environment) {
        return None;
    }
    let (layer, _handle) = DiscordLayer::new(handler, config.channel_buffer);
    Some(layer)
}

/// Initialize global `tracing` subscriber with the Discord layer and the
/// provided [`LayerConfig`].
///
/// **Effects**
///
/// Installs a [`Registry`] combined with the (possibly inactive) Discord
/// layer as the global default subscriber, plus a `fmt` layer when
/// `enable_stdout` is set.
pub fn init_tracing_with_config(
    handler: DiscordHandler,
    config: LayerConfig,
) -> Result<(), SetGlobalDefaultError> {
    let layer = build_layer(handler, &config);

    // Два варианта subscriber'а, чтобы типы сходились.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)
    }
}

/// Initialize tracing with [`LayerConfig::default`].
pub fn init_tracing(handler: DiscordHandler) -> Result<(), SetGlobalDefaultError> {
    init_tracing_with_config(handler, LayerConfig::default())
}

/// Errors raised while wiring the layer from environment variables.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Delivery(#[from] crate::sink::DeliveryError),

    #[error(transparent)]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Read `DISCORD_*` and `APP_*` variables, build an HTTP handler and
/// install it. The recommended entrypoint for typical services.
#[cfg(feature = "webhook")]
pub fn init_tracing_from_env() -> Result<(), InitError> {
    use crate::config::{AppSettings, HandlerConfig};

    let config = HandlerConfig::from_env()?;
    let app = AppSettings::from_env();
    let handler = DiscordHandler::with_http(config, app)?;
    init_tracing(handler)?;
    Ok(())
}
