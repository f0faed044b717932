use crate::config::{AppSettings, HandlerConfig};
use crate::fields::{truncate, DisplayField};
use crate::level::Severity;
use crate::record::LogRecord;
use serde::Serialize;
use serde_json::{Map, Value};

pub const PRODUCT_TAG: &str = "Discord Logger";
pub const CONTEXT_EMBED_TITLE: &str = "📋 Full Context & Extra Data";
pub const CONTEXT_EMBED_COLOR: u32 = 0x95A5A6;

const DESCRIPTION_MARGIN: usize = 10;
const CONTEXT_DESCRIPTION_MARGIN: usize = 15;

/// A styled message block as understood by the Discord webhook API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<DisplayField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Values derived once from a record and shared by both embeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEvent {
    pub title: String,
    pub color: u32,
    /// ISO-8601, millisecond precision, UTC.
    pub timestamp: String,
}

impl RenderedEvent {
    pub fn new(record: &LogRecord) -> Self {
        let style = record.level.style();
        RenderedEvent {
            title: format!("{} {} Log", style.glyph, capitalized(record.level)),
            color: style.color,
            timestamp: record.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        }
    }
}

fn capitalized(level: Severity) -> String {
    let name = level.as_str();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Build the primary embed and, when enabled and there is data to show,
/// the raw context embed.
pub fn build_embeds(
    record: &LogRecord,
    fields: Vec<DisplayField>,
    config: &HandlerConfig,
    app: &AppSettings,
) -> Vec<Embed> {
    let rendered = RenderedEvent::new(record);
    let mut embeds = vec![primary_embed(record, &rendered, fields, config, app)];

    if config.context {
        if let Some(embed) = context_embed(record, &rendered, config) {
            embeds.push(embed);
        }
    }

    embeds
}

fn primary_embed(
    record: &LogRecord,
    rendered: &RenderedEvent,
    fields: Vec<DisplayField>,
    config: &HandlerConfig,
    app: &AppSettings,
) -> Embed {
    let message = truncate(
        &record.message,
        config.max_description_length.saturating_sub(DESCRIPTION_MARGIN),
    );

    Embed {
        title: rendered.title.clone(),
        description: format!("```\n{}\n```", message),
        color: rendered.color,
        timestamp: rendered.timestamp.clone(),
        fields,
        footer: Some(EmbedFooter {
            text: format!("{} • {}", config.footer_suffix(app), PRODUCT_TAG),
            icon_url: config.footer_icon_url.clone(),
        }),
    }
}

fn context_embed(record: &LogRecord, rendered: &RenderedEvent, config: &HandlerConfig) -> Option<Embed> {
    if record.context.is_empty() && record.extra.is_empty() {
        return None;
    }

    let mut data = Map::new();
    if !record.context.is_empty() {
        data.insert("Context".to_string(), Value::Object(record.context.clone()));
    }
    if !record.extra.is_empty() {
        data.insert("Extra".to_string(), Value::Object(record.extra.clone()));
    }

    let json = serde_json::to_string_pretty(&Value::Object(data)).unwrap_or_default();
    let json = truncate(
        &json,
        config.max_description_length.saturating_sub(CONTEXT_DESCRIPTION_MARGIN),
    );

    Some(Embed {
        title: CONTEXT_EMBED_TITLE.to_string(),
        description: format!("```json\n{}\n```", json),
        color: CONTEXT_EMBED_COLOR,
        timestamp: rendered.timestamp.clone(),
        fields: Vec::new(),
        footer: None,
    })
}
