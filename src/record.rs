use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorization tag assigned to arcs produced by this crate, so the
/// commit endpoint can tell client-origin entries apart from server ones.
pub const DEFAULT_QUIDDITY: &str = "COMPONENT";

/// Value written to `exceptionType` whenever an error value was logged.
pub const EXCEPTION_TYPE: &str = "ClientError";

/// Severity of an arc. Serialized with the upper-case names the commit
/// endpoint expects.
///
/// `Trace` is only used when an arc is queued without choosing a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    #[default]
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => LogLevel::Error,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::DEBUG => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// One fully normalized arc, ready to be committed.
///
/// `details` is always a serialized JSON string by the time a record
/// exists: the commit endpoint cannot carry nested structures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub log_level: LogLevel,
    pub quiddity: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_line_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_stack: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_context: Option<serde_json::Value>,
}

impl LogRecord {
    /// Bare record carrying only the defaults: the given level, the
    /// default quiddity and empty details.
    pub fn bare(level: LogLevel) -> Self {
        LogRecord {
            timestamp: Utc::now(),
            log_level: level,
            quiddity: DEFAULT_QUIDDITY.to_string(),
            class_name: None,
            method_name: None,
            line_number: None,
            stack_trace: None,
            exception_type: None,
            exception_message: None,
            exception_line_number: None,
            exception_cause: None,
            exception_stack: None,
            message: None,
            details: "{}".to_string(),
            record_context: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_are_camel_case_and_levels_upper_case() {
        let mut record = LogRecord::bare(LogLevel::Warn);
        record.method_name = Some("load".into());
        record.exception_line_number = Some(7);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["logLevel"], "WARN");
        assert_eq!(value["quiddity"], "COMPONENT");
        assert_eq!(value["methodName"], "load");
        assert_eq!(value["exceptionLineNumber"], 7);
        assert!(value.get("className").is_none());
        assert!(value.get("recordContext").is_none());
    }

    #[test]
    fn default_level_is_trace() {
        assert_eq!(LogLevel::default(), LogLevel::Trace);
        assert_eq!(LogLevel::from(tracing::Level::DEBUG), LogLevel::Debug);
        assert!(LogLevel::Error < LogLevel::Trace);
    }
}
