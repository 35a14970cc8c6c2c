use crate::callsite::{locate_frame, resolve_location, StackFormat};
use crate::context::ContextLocation;
use crate::input::{is_blank, ArcInput, PartialRecord};
use crate::record::{LogLevel, LogRecord, EXCEPTION_TYPE};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Key under which the current page URL is added to `details`.
pub const URL_KEY: &str = "_url";

/// Key wrapping `details` that were not a JSON object.
pub const VALUE_KEY: &str = "value";

/// Turns caller input into a canonical [`LogRecord`].
///
/// Normalization never fails: unexpected shapes fall through to the
/// default arc and unresolvable call sites degrade to sentinel values.
#[derive(Clone)]
pub struct Normalizer {
    location: Arc<dyn ContextLocation>,
    stack_format: StackFormat,
}

impl Normalizer {
    /// Normalizer resolving call sites from native Rust backtraces.
    pub fn new(location: Arc<dyn ContextLocation>) -> Self {
        Normalizer {
            location,
            stack_format: StackFormat::native(),
        }
    }

    pub fn with_stack_format(mut self, stack_format: StackFormat) -> Self {
        self.stack_format = stack_format;
        self
    }

    pub fn stack_format(&self) -> &StackFormat {
        &self.stack_format
    }

    /// Build the arc for `input`. `level` always wins over anything the
    /// input carries.
    pub fn normalize(&self, level: LogLevel, input: ArcInput) -> LogRecord {
        let partial = match input {
            ArcInput::Text(message) => PartialRecord::message(message),
            ArcInput::Error(error) => PartialRecord {
                error: Some(error),
                ..Default::default()
            },
            ArcInput::Partial(partial) => partial,
            ArcInput::Other(_) => PartialRecord::default(),
        };
        self.build(level, partial)
    }

    fn build(&self, level: LogLevel, partial: PartialRecord) -> LogRecord {
        let caller_located = partial.has_location();

        let mut record = LogRecord::bare(level);
        if let Some(quiddity) = partial.quiddity {
            record.quiddity = quiddity;
        }
        record.class_name = partial.class_name;
        record.method_name = partial.method_name;
        record.line_number = partial.line_number;
        record.stack_trace = partial.stack_trace;
        record.exception_type = partial.exception_type;
        record.exception_message = partial.exception_message;
        record.exception_line_number = partial.exception_line_number;
        record.exception_cause = partial.exception_cause;
        record.exception_stack = partial.exception_stack;
        record.message = partial.message;
        record.record_context = partial.record_context;
        record.details = self.serialize_details(partial.details);

        if let Some(error) = partial.error {
            record.exception_type = Some(EXCEPTION_TYPE.to_string());
            record.exception_line_number = error.stack.as_deref().and_then(|s| self.exception_line(s));
            record.exception_message = Some(error.message).filter(|m| !m.is_empty());
            record.exception_stack = error.stack;
            if error.cause.is_some() {
                record.exception_cause = error.cause;
            }
        }

        if !caller_located {
            let site = resolve_location(&self.stack_format);
            record.stack_trace = Some(site.stack_trace);
            record.method_name = site.method_name;
            record.class_name = Some(site.class_name);
            record.line_number = Some(site.line_number);
        }

        record
    }

    fn serialize_details(&self, details: Option<Value>) -> String {
        let mut map = match details {
            Some(Value::Object(map)) => map,
            Some(value) if !is_blank(&value) => {
                let mut map = Map::new();
                map.insert(VALUE_KEY.to_string(), value);
                map
            }
            _ => Map::new(),
        };
        map.insert(URL_KEY.to_string(), Value::String(self.location.current_url()));

        serde_json::to_string(&map).unwrap_or_else(|_| "{}".to_string())
    }

    fn exception_line(&self, stack: &str) -> Option<i64> {
        locate_frame(stack, &self.stack_format)
            .or_else(|| locate_frame(stack, &StackFormat::browser()))
            .map(|site| site.line_number)
    }
}
