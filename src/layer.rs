use crate::context::{self, process_memory_usage, RuntimeContext};
use crate::handler::{DiscordHandler, DIAGNOSTIC_TARGET};
use crate::level::Severity;
use crate::record::{ExceptionInfo, LogRecord};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Targets never forwarded: the handler's diagnostics and the HTTP stack
/// used for delivery, which would otherwise feed back into the webhook.
const IGNORED_TARGETS: [&str; 5] = [DIAGNOSTIC_TARGET, "hyper", "reqwest", "h2", "rustls"];

/// Event field that overrides the level derived from `tracing::Level`.
pub const SEVERITY_FIELD: &str = "severity";
/// Prefix routing an event field into the record's `extra` data.
pub const EXTRA_PREFIX: &str = "extra.";

/// One queued delivery.
struct Job {
    record: LogRecord,
    ctx: RuntimeContext,
}

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s and
/// hands them to a [`DiscordHandler`] via a bounded channel and background
/// task.
///
/// Only events at or above the handler's configured level are forwarded.
/// Network I/O is fully decoupled from application threads; when the
/// channel is full new records are dropped.
pub struct DiscordLayer {
    sender: mpsc::Sender<Job>,
    min_level: Severity,
    environment: String,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Successfully enqueued into channel.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full.
    pub dropped_events: Arc<AtomicU64>,
    /// Handed to the handler by the background task.
    pub delivered_events: Arc<AtomicU64>,
}

impl DiscordLayer {
    /// Create a new layer and spawn a background task that pulls records
    /// from a bounded channel and delivers them one by one.
    ///
    /// Must be called inside a Tokio runtime. `buffer` is raised to at
    /// least 16.
    pub fn new(handler: DiscordHandler, buffer: usize) -> (Self, JoinHandle<()>) {
        let buffer = buffer.max(16);
        let (tx, mut rx) = mpsc::channel::<Job>(buffer);

        let min_level = handler.config().level;
        let environment = handler.app().environment.clone();

        let total_events = Arc::new(AtomicU64::new(0));
        let enqueued_events = Arc::new(AtomicU64::new(0));
        let dropped_events = Arc::new(AtomicU64::new(0));
        let delivered_events = Arc::new(AtomicU64::new(0));

        let delivered_events_bg = Arc::clone(&delivered_events);

        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                handler.deliver(&job.record, &job.ctx).await;
                delivered_events_bg.fetch_add(1, Ordering::Relaxed);
            }
        });

        (Self {
            sender: tx,
            min_level,
            environment,
            total_events,
            enqueued_events,
            dropped_events,
            delivered_events,
        }, handle)
    }

    fn runtime_context<S>(&self, event: &Event<'_>, ctx: &Context<'_, S>) -> RuntimeContext
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        // Closest span wins.
        let mut merged: BTreeMap<String, String> = BTreeMap::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<SpanFields>() {
                    for (key, value) in &fields.0 {
                        merged.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
            }
        }

        RuntimeContext::from_span_fields(self.environment.clone(), |key| {
            merged.get(key).map(String::as_str)
        })
        .with_memory_usage(process_memory_usage())
    }
}

impl<S> Layer<S> for DiscordLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = SpanFields::default();
        attrs.record(&mut SpanVisitor { fields: &mut fields.0 });
        span.extensions_mut().insert(fields);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            values.record(&mut SpanVisitor { fields: &mut fields.0 });
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        if is_ignored_target(meta.target()) {
            return;
        }
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        // TRACE only reaches Discord with an explicit `severity` field.
        if visitor.severity.is_none() && *meta.level() == tracing::Level::TRACE {
            return;
        }
        let level = visitor.severity.unwrap_or_else(|| Severity::from(meta.level()));
        if level < self.min_level {
            return;
        }

        let exception = visitor.exception.map(|exception| match (meta.file(), meta.line()) {
            (Some(file), Some(line)) => exception.at(file, line),
            _ => exception,
        });

        let record = LogRecord {
            timestamp: Utc::now(),
            level,
            channel: meta.target().to_string(),
            message: visitor.message.unwrap_or_default(),
            context: visitor.context,
            extra: visitor.extra,
            exception,
        };
        let ctx = self.runtime_context(event, &ctx);

        match self.sender.try_send(Job { record, ctx }) {
            Ok(()) => {
                self.enqueued_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(_e) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("discord log channel full, dropping log record");
            }
        }
    }
}

/// Matches an ignored target or any of its submodules.
fn is_ignored_target(target: &str) -> bool {
    IGNORED_TARGETS.iter().any(|t| {
        target
            .strip_prefix(t)
            .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
    })
}

/// Request and user attributes recorded on a span.
#[derive(Default)]
struct SpanFields(BTreeMap<String, String>);

struct SpanVisitor<'a> {
    fields: &'a mut BTreeMap<String, String>,
}

impl SpanVisitor<'_> {
    fn insert(&mut self, field: &Field, value: String) {
        if context::keys::ALL.contains(&field.name()) {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for SpanVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.insert(field, format!("{:?}", value));
    }
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    severity: Option<Severity>,
    context: Map<String, Value>,
    extra: Map<String, Value>,
    exception: Option<ExceptionInfo>,
}

impl EventVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        match field.name().strip_prefix(EXTRA_PREFIX) {
            Some(key) => self.extra.insert(key.to_string(), value),
            None => self.context.insert(field.name().to_string(), value),
        };
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            SEVERITY_FIELD => match value.parse() {
                Ok(severity) => self.severity = Some(severity),
                Err(_) => self.insert(field, Value::from(value)),
            },
            _ => self.insert(field, Value::from(value)),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, _field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.exception = Some(ExceptionInfo::from_dyn(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let text = format!("{:?}", value);
        match field.name() {
            "message" => self.message = Some(text),
            SEVERITY_FIELD => self.record_str(field, &text),
            _ => self.insert(field, Value::String(text)),
        }
    }
}
