use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a log record, ordered from least to most severe.
///
/// `tracing` only knows five levels; the remaining ones (notice, critical,
/// alert, emergency) are reachable through the `severity` event field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Severity {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl Severity {
    pub const ALL: [Severity; 8] = [
        Severity::Debug,
        Severity::Info,
        Severity::Notice,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
        Severity::Alert,
        Severity::Emergency,
    ];

    /// Lowercase name as used in configuration (`"warning"`, `"error"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
            Severity::Alert => "alert",
            Severity::Emergency => "emergency",
        }
    }

    pub fn style(&self) -> LevelStyle {
        LevelStyle::for_severity(*self)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a level name is not one of the eight severities.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "notice" => Ok(Severity::Notice),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            "alert" => Ok(Severity::Alert),
            "emergency" => Ok(Severity::Emergency),
            _ => Err(UnknownSeverity(s.to_string())),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = UnknownSeverity;

    fn try_from(s: String) -> Result<Self, <Self as TryFrom<String>>::Error> {
        s.parse()
    }
}

impl From<&tracing::Level> for Severity {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::ERROR => Severity::Error,
            tracing::Level::WARN => Severity::Warning,
            tracing::Level::INFO => Severity::Info,
            tracing::Level::DEBUG | tracing::Level::TRACE => Severity::Debug,
        }
    }
}

/// Visual styling of an embed for a given level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelStyle {
    pub glyph: &'static str,
    /// 24-bit RGB color.
    pub color: u32,
}

/// Style used for level names outside the severity table.
pub const DEFAULT_STYLE: LevelStyle = LevelStyle { glyph: "📝", color: 0x34495E };

// Indexed by `Severity as usize`.
const STYLES: [LevelStyle; 8] = [
    LevelStyle { glyph: "🔍", color: 0x95A5A6 },
    LevelStyle { glyph: "ℹ️", color: 0x2ECC71 },
    LevelStyle { glyph: "🔔", color: 0x3498DB },
    LevelStyle { glyph: "⚠️", color: 0xF39C12 },
    LevelStyle { glyph: "❌", color: 0xE74C3C },
    LevelStyle { glyph: "💥", color: 0xFF4500 },
    LevelStyle { glyph: "🔴", color: 0xFF0000 },
    LevelStyle { glyph: "🚨", color: 0x8B0000 },
];

impl LevelStyle {
    pub fn for_severity(severity: Severity) -> Self {
        STYLES[severity as usize]
    }

    /// Look up a style by level name, falling back to [`DEFAULT_STYLE`].
    pub fn for_name(name: &str) -> Self {
        name.parse::<Severity>()
            .map(Self::for_severity)
            .unwrap_or(DEFAULT_STYLE)
    }
}
