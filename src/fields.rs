use crate::config::{AppSettings, HandlerConfig};
use crate::context::RuntimeContext;
use crate::record::{ExceptionInfo, LogRecord};
use serde::Serialize;
use serde_json::Value;

/// Discord rejects embeds with more fields than this.
pub const MAX_FIELDS: usize = 25;
/// Discord limit on a field name.
pub const MAX_FIELD_NAME_LENGTH: usize = 256;

/// Custom context stops once this many fields exist.
const CONTEXT_FIELD_CAP: usize = 23;
/// Extra data stops once this many fields exist.
const EXTRA_FIELD_CAP: usize = 24;
/// Room kept for "```json\n" and "\n```".
const JSON_FENCE_MARGIN: usize = 12;

/// Context keys carrying a user identifier, checked in order.
pub const USER_ID_KEYS: [&str; 2] = ["user_id", "userId"];
/// Context key reserved for an attached error.
pub const EXCEPTION_KEY: &str = "exception";
/// Shown instead of an empty value; Discord rejects empty field values.
pub const EMPTY_VALUE: &str = "-";

/// One name/value pair of an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Ordered field list that bounds every value it accepts.
struct FieldList {
    fields: Vec<DisplayField>,
    max_value: usize,
}

impl FieldList {
    fn new(max_value: usize) -> Self {
        Self { fields: Vec::with_capacity(MAX_FIELDS), max_value }
    }

    fn len(&self) -> usize {
        self.fields.len()
    }

    fn push(&mut self, name: impl AsRef<str>, value: impl AsRef<str>, inline: bool) {
        let value = match value.as_ref() {
            "" => EMPTY_VALUE,
            v => v,
        };
        self.fields.push(DisplayField {
            name: truncate(name.as_ref(), MAX_FIELD_NAME_LENGTH),
            value: truncate(value, self.max_value),
            inline,
        });
    }
}

/// Turn a record and its runtime context into the ordered embed fields.
///
/// Order is fixed: environment, timestamp, channel, request, user,
/// exception, custom context (until 23 fields), extra (until 24 fields),
/// memory usage. The result is cut to [`MAX_FIELDS`].
pub fn build_fields(
    record: &LogRecord,
    ctx: &RuntimeContext,
    config: &HandlerConfig,
    app: &AppSettings,
) -> Vec<DisplayField> {
    let mut fields = FieldList::new(config.max_field_length);

    fields.push("🌍 Environment", &ctx.environment, true);
    fields.push("⏰ Timestamp", record.timestamp.format("%Y-%m-%d %H:%M:%S %Z").to_string(), true);
    fields.push("📡 Channel", &record.channel, true);

    if !ctx.interactive {
        add_request_fields(&mut fields, ctx);
    }
    add_user_fields(&mut fields, record, ctx);
    if let Some(exception) = &record.exception {
        add_exception_fields(&mut fields, exception, app);
    }
    add_context_fields(&mut fields, record, config.max_field_length);
    add_extra_fields(&mut fields, record);

    fields.push("💾 Memory Usage", format_bytes(ctx.memory_usage), true);

    let mut fields = fields.fields;
    fields.truncate(MAX_FIELDS);
    fields
}

fn add_request_fields(fields: &mut FieldList, ctx: &RuntimeContext) {
    let Some(request) = &ctx.request else {
        return;
    };

    if !request.url.is_empty() {
        fields.push("🌐 URL", &request.url, false);
    }
    if !request.method.is_empty() {
        fields.push("📋 Method", &request.method, true);
    }
    if let Some(address) = &request.client_address {
        fields.push("🌍 IP Address", address, true);
    }
    if let Some(agent) = request.user_agent.as_deref().filter(|a| !a.is_empty()) {
        fields.push("🖥️ User Agent", agent, false);
    }
    if let Some(referer) = request.referer.as_deref().filter(|r| !r.is_empty()) {
        fields.push("🔗 Referer", referer, false);
    }
}

fn add_user_fields(fields: &mut FieldList, record: &LogRecord, ctx: &RuntimeContext) {
    if let Some(id) = USER_ID_KEYS.iter().find_map(|k| record.context.get(*k)) {
        fields.push("👤 User ID", scalar_text(id), true);
    }

    if let Some(user) = &ctx.user {
        let value = match &user.email {
            Some(email) => format!("{} ({})", user.id, email),
            None => user.id.clone(),
        };
        fields.push("🔐 Authenticated User", value, true);
    }
}

fn add_exception_fields(fields: &mut FieldList, exception: &ExceptionInfo, app: &AppSettings) {
    fields.push("💥 Exception", &exception.type_name, true);

    if let Some(file) = &exception.file {
        let relative = app
            .base_path
            .as_deref()
            .and_then(|base| file.strip_prefix(base))
            .unwrap_or(file.as_str());
        let line = exception.line.unwrap_or(0);
        fields.push("📁 File", format!("`{}:{}`", relative, line), false);
    }

    if exception.code != 0 {
        fields.push("🔢 Code", exception.code.to_string(), true);
    }

    if let Some(cause) = &exception.cause {
        fields.push("🔗 Previous Exception", cause, true);
    }
}

fn add_context_fields(fields: &mut FieldList, record: &LogRecord, max_len: usize) {
    for (key, value) in &record.context {
        if key == EXCEPTION_KEY || USER_ID_KEYS.iter().any(|k| *k == key.as_str()) {
            continue;
        }
        if fields.len() >= CONTEXT_FIELD_CAP {
            break;
        }

        let name = format!("📋 {}", key);
        if is_scalar(value) {
            fields.push(name, scalar_text(value), true);
        } else if max_len <= JSON_FENCE_MARGIN {
            // No room for the fence.
            fields.push(name, value.to_string(), true);
        } else {
            let json = serde_json::to_string_pretty(value).unwrap_or_default();
            let body = truncate(&json, max_len.saturating_sub(JSON_FENCE_MARGIN));
            fields.push(name, format!("```json\n{}\n```", body), false);
        }
    }
}

fn add_extra_fields(fields: &mut FieldList, record: &LogRecord) {
    for (key, value) in &record.extra {
        if fields.len() >= EXTRA_FIELD_CAP {
            break;
        }
        if is_scalar(value) {
            fields.push(format!("⚙️ {}", key), scalar_text(value), true);
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Cut `text` to at most `max` characters, ending in `...` when cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max < 3 {
        return text.chars().take(max).collect();
    }
    let mut out: String = text.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

/// Human readable byte count with binary units, e.g. `1.5 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value > 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AuthenticatedUser, RequestInfo};
    use crate::level::Severity;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn record() -> LogRecord {
        LogRecord::new(Severity::Error, "disk full")
            .with_channel("app")
            .with_timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn names(fields: &[DisplayField]) -> Vec<&str> {
        fields.iter().map(|f| f.name.as_str()).collect()
    }

    fn build(record: &LogRecord, ctx: &RuntimeContext) -> Vec<DisplayField> {
        build_fields(record, ctx, &HandlerConfig::default(), &AppSettings::default())
    }

    #[test]
    fn leading_and_trailing_fields() {
        let ctx = RuntimeContext::new("production").with_memory_usage(2 * 1024 * 1024);
        let fields = build(&record(), &ctx);

        assert_eq!(
            names(&fields),
            vec!["🌍 Environment", "⏰ Timestamp", "📡 Channel", "💾 Memory Usage"]
        );
        assert_eq!(fields[0].value, "production");
        assert_eq!(fields[1].value, "2024-01-01 00:00:00 UTC");
        assert_eq!(fields[3].value, "2 MB");
        assert!(fields.iter().all(|f| f.inline));
    }

    #[test]
    fn request_fields_only_outside_interactive_mode() {
        let request = RequestInfo {
            url: "https://shop.test/cart".into(),
            method: "GET".into(),
            client_address: Some("127.0.0.1".into()),
            user_agent: Some("curl/8".into()),
            referer: None,
        };
        let ctx = RuntimeContext::new("production").with_request(request.clone());
        let fields = build(&record(), &ctx);
        assert_eq!(
            names(&fields)[3..7],
            ["🌐 URL", "📋 Method", "🌍 IP Address", "🖥️ User Agent"]
        );
        assert!(!fields[3].inline);

        let mut interactive = ctx.clone();
        interactive.interactive = true;
        assert_eq!(build(&record(), &interactive).len(), 4);
    }

    #[test]
    fn user_fields() {
        let ctx = RuntimeContext::new("production").with_user(AuthenticatedUser {
            id: "7".into(),
            email: Some("ops@example.com".into()),
        });
        let fields = build(&record().with_context("userId", "u1"), &ctx);

        assert_eq!(fields[3].name, "👤 User ID");
        assert_eq!(fields[3].value, "u1");
        assert_eq!(fields[4].name, "🔐 Authenticated User");
        assert_eq!(fields[4].value, "7 (ops@example.com)");
        // the user id is not repeated as a custom field
        assert_eq!(fields.len(), 6);
    }

    #[test]
    fn exception_fields() {
        let app = AppSettings { base_path: Some("/srv/app/".into()), ..AppSettings::default() };
        let exception = ExceptionInfo::new("QueryError", "timeout")
            .at("/srv/app/src/db.rs", 42)
            .with_code(57)
            .with_cause("IoError");
        let fields = build_fields(
            &record().with_exception(exception),
            &RuntimeContext::new("production"),
            &HandlerConfig::default(),
            &app,
        );

        assert_eq!(
            names(&fields)[3..7],
            ["💥 Exception", "📁 File", "🔢 Code", "🔗 Previous Exception"]
        );
        assert_eq!(fields[4].value, "`src/db.rs:42`");
        assert_eq!(fields[5].value, "57");
        assert_eq!(fields[6].value, "IoError");
    }

    #[test]
    fn zero_code_is_omitted() {
        let exception = ExceptionInfo::new("Oops", "x");
        let fields = build(&record().with_exception(exception), &RuntimeContext::new("production"));
        assert!(!names(&fields).contains(&"🔢 Code"));
    }

    #[test]
    fn scalar_and_structured_context() {
        let rec = record()
            .with_context("order", 123)
            .with_context("paid", false)
            .with_context("note", Value::Null)
            .with_context("items", json!(["a", "b"]));
        let fields = build(&rec, &RuntimeContext::new("production"));

        assert_eq!(fields[3].value, "123");
        assert_eq!(fields[4].value, "false");
        assert_eq!(fields[5].value, "null");
        assert_eq!(fields[6].name, "📋 items");
        assert!(!fields[6].inline);
        assert!(fields[6].value.starts_with("```json\n["));
        assert!(fields[6].value.ends_with("\n```"));
    }

    #[test]
    fn thirty_context_keys_yield_twenty_three_custom_fields() {
        let mut rec = record();
        for i in 0..30 {
            rec = rec.with_context(format!("key{i}"), i);
        }
        let fields = build(&rec, &RuntimeContext::new("production"));

        let custom = fields.iter().filter(|f| f.name.starts_with("📋 key")).count();
        // leading fields count toward the cap of 23
        assert_eq!(custom, 20);
        assert_eq!(fields.len(), 24);
        assert_eq!(fields[3].name, "📋 key0");
        assert_eq!(fields.last().unwrap().name, "💾 Memory Usage");
    }

    #[test]
    fn extra_fills_up_to_twenty_four_and_skips_structures() {
        let mut rec = record().with_extra("nested", json!({"a": 1}));
        for i in 0..30 {
            rec = rec.with_extra(format!("x{i}"), i);
        }
        let fields = build(&rec, &RuntimeContext::new("production"));

        assert_eq!(fields.len(), 25);
        assert_eq!(fields[3].name, "⚙️ x0");
        assert!(!names(&fields).contains(&"⚙️ nested"));
        assert_eq!(fields[24].name, "💾 Memory Usage");
    }

    #[test]
    fn field_count_never_exceeds_limit() {
        let request = RequestInfo {
            url: "u".into(),
            method: "GET".into(),
            client_address: Some("ip".into()),
            user_agent: Some("ua".into()),
            referer: Some("ref".into()),
        };
        let ctx = RuntimeContext::new("production")
            .with_request(request)
            .with_user(AuthenticatedUser { id: "1".into(), email: None });
        let mut rec = record()
            .with_context("user_id", "u")
            .with_exception(ExceptionInfo::new("E", "m").at("f.rs", 1).with_code(1).with_cause("C"));
        for i in 0..40 {
            rec = rec.with_context(format!("c{i}"), i).with_extra(format!("e{i}"), i);
        }

        let fields = build(&rec, &ctx);
        assert_eq!(fields.len(), MAX_FIELDS);
    }

    #[test]
    fn long_values_are_truncated_exactly() {
        let config = HandlerConfig { max_field_length: 50, ..HandlerConfig::default() };
        let rec = record()
            .with_context("blob", "x".repeat(500))
            .with_context("tree", json!({"k": "y".repeat(500)}));
        let fields = build_fields(&rec, &RuntimeContext::new("production"), &config, &AppSettings::default());

        assert_eq!(fields[3].value.chars().count(), 50);
        assert!(fields[3].value.ends_with("..."));
        assert!(fields[4].value.chars().count() <= 50);
        assert!(fields[4].value.ends_with("\n```"));
    }

    #[test]
    fn empty_values_get_placeholder() {
        let rec = LogRecord::new(Severity::Error, "x")
            .with_channel("")
            .with_context("note", "")
            .with_extra("tag", "");
        let fields = build(&rec, &RuntimeContext::new(""));

        assert!(fields.iter().all(|f| !f.value.is_empty()));
        let value = |name: &str| fields.iter().find(|f| f.name == name).map(|f| f.value.as_str());
        assert_eq!(value("🌍 Environment"), Some(EMPTY_VALUE));
        assert_eq!(value("📡 Channel"), Some(EMPTY_VALUE));
        assert_eq!(value("📋 note"), Some(EMPTY_VALUE));
        assert_eq!(value("⚙️ tag"), Some(EMPTY_VALUE));
    }

    #[test]
    fn structures_skip_fence_when_limit_is_tiny() {
        let config = HandlerConfig { max_field_length: 10, ..HandlerConfig::default() };
        let rec = record().with_context("tree", json!({"k": "value"}));
        let fields = build_fields(&rec, &RuntimeContext::new("production"), &config, &AppSettings::default());

        assert_eq!(fields[3].name, "📋 tree");
        assert_eq!(fields[3].value, "{\"k\":\"v...");
        assert!(!fields[3].value.contains("```"));
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("héllo", 10), "héllo");
        assert_eq!(truncate("ééééééé", 5), "éé...");
        assert_eq!(truncate("abcdef", 2), "ab");
    }

    #[test]
    fn formats_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1024), "1024 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5 GB");
        assert_eq!(format_bytes(3 * 1024_u64.pow(5)), "3072 TB");
    }
}
