use crate::level::Severity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;

/// A single log event as seen by the Discord handler.
///
/// `context` and `extra` keep insertion order; it decides the order of the
/// rendered fields and which of them survive the field cap.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Severity,
    pub channel: String,
    pub message: String,
    pub context: Map<String, Value>,
    pub extra: Map<String, Value>,
    pub exception: Option<ExceptionInfo>,
}

impl LogRecord {
    pub fn new(level: Severity, message: impl Into<String>) -> Self {
        LogRecord {
            timestamp: Utc::now(),
            level,
            channel: "app".to_string(),
            message: message.into(),
            context: Map::new(),
            extra: Map::new(),
            exception: None,
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }
}

/// Summary of an error attached to a record.
///
/// Only one level of the cause chain is kept; deeper causes are not
/// summarized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionInfo {
    pub type_name: String,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub code: i64,
    pub cause: Option<String>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        ExceptionInfo {
            type_name: type_name.into(),
            message: message.into(),
            file: None,
            line: None,
            code: 0,
            cause: None,
        }
    }

    /// Capture a typed error at the caller's location.
    #[track_caller]
    pub fn capture<E: Error + 'static>(err: &E) -> Self {
        let location = std::panic::Location::caller();
        let mut info = ExceptionInfo::new(std::any::type_name::<E>(), err.to_string())
            .at(location.file(), location.line());
        info.cause = err.source().map(debug_type_name);
        info
    }

    /// Build from a type-erased error, as handed out by `tracing`'s
    /// `record_error`. The type name is the head of the `Debug` output.
    pub fn from_dyn(err: &(dyn Error + 'static)) -> Self {
        let mut info = ExceptionInfo::new(debug_type_name(err), err.to_string());
        info.cause = err.source().map(debug_type_name);
        info
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

/// `ParseIntError { kind: InvalidDigit }` -> `ParseIntError`.
fn debug_type_name(err: &(dyn Error + 'static)) -> String {
    let debug = format!("{:?}", err);
    let head = debug
        .split(|c: char| c == ' ' || c == '{' || c == '(')
        .next()
        .unwrap_or_default();
    if head.is_empty() {
        "Error".to_string()
    } else {
        head.to_string()
    }
}
