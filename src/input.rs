use serde::Deserialize;
use serde_json::{Map, Value};
use std::backtrace::Backtrace;
use std::error::Error;

/// What a caller handed to one of the leveled entry points.
///
/// The variant is decided once, at the call boundary; everything after
/// that matches on it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum ArcInput {
    /// Plain message text.
    Text(String),
    /// An error value; becomes the `exception*` fields of the arc.
    Error(ErrorValue),
    /// A partially filled arc.
    Partial(PartialRecord),
    /// Anything else. Merged as-is, which leaves the default arc untouched.
    Other(Value),
}

/// Error-like value: a message plus, optionally, the stack it was raised
/// from and a description of its cause.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ErrorValue {
    pub message: String,
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub cause: Option<String>,
}

impl ErrorValue {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorValue {
            message: message.into(),
            stack: None,
            cause: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Capture a native error together with a backtrace taken right here.
    ///
    /// The `source()` chain is flattened into `cause`, outermost first.
    pub fn from_error<E: Error + ?Sized>(err: &E) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(inner) = source {
            causes.push(inner.to_string());
            source = inner.source();
        }

        ErrorValue {
            message: err.to_string(),
            stack: Some(Backtrace::force_capture().to_string()),
            cause: if causes.is_empty() {
                None
            } else {
                Some(causes.join(": "))
            },
        }
    }

    /// Read an error-like JSON object: one exposing both `stack` and
    /// `message`. Returns `None` for any other shape.
    pub fn from_json(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let message = present(map, "message")?;
        let stack = present(map, "stack")?;

        Some(ErrorValue {
            message: text_of(message),
            stack: Some(text_of(stack)),
            cause: present(map, "cause").map(text_of),
        })
    }

    /// Read the `error` field of a partial arc. Looser than [`from_json`]:
    /// an object needs no `stack`, and any other non-blank value becomes
    /// the message as text.
    ///
    /// [`from_json`]: ErrorValue::from_json
    pub fn from_field(value: &Value) -> Option<Self> {
        if is_blank(value) {
            return None;
        }
        let map = match value.as_object() {
            Some(map) => map,
            None => return Some(ErrorValue::new(text_of(value))),
        };

        Some(ErrorValue {
            message: present(map, "message").map(text_of).unwrap_or_default(),
            stack: present(map, "stack").map(text_of),
            cause: present(map, "cause").map(text_of),
        })
    }
}

/// Caller-supplied arc fields. Every field is optional; whatever is set
/// wins over the defaults, except the level, which always comes from the
/// entry point that was called.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialRecord {
    pub quiddity: Option<String>,

    pub class_name: Option<String>,
    pub method_name: Option<String>,
    #[serde(alias = "lineNum")]
    pub line_number: Option<i64>,
    pub stack_trace: Option<String>,

    pub exception_type: Option<String>,
    pub exception_message: Option<String>,
    pub exception_line_number: Option<i64>,
    pub exception_cause: Option<String>,
    pub exception_stack: Option<String>,

    pub message: Option<String>,
    pub details: Option<Value>,
    pub record_context: Option<Value>,

    pub error: Option<ErrorValue>,
}

impl PartialRecord {
    pub fn message(message: impl Into<String>) -> Self {
        PartialRecord {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// True when the caller supplied any location field, in which case
    /// call-site resolution is skipped for all of them.
    pub fn has_location(&self) -> bool {
        self.method_name.is_some()
            || self.class_name.is_some()
            || self.line_number.is_some()
            || self.stack_trace.is_some()
    }

    /// Best-effort read of a JSON object. Known keys holding a value of the
    /// wrong type are ignored rather than failing the whole conversion.
    pub fn from_json_lossy(map: &Map<String, Value>) -> Self {
        let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
        let number = |key: &str| map.get(key).and_then(Value::as_i64);
        let raw = |key: &str| map.get(key).filter(|v| !v.is_null()).cloned();

        PartialRecord {
            quiddity: text("quiddity"),
            class_name: text("className"),
            method_name: text("methodName"),
            line_number: number("lineNumber").or_else(|| number("lineNum")),
            stack_trace: text("stackTrace"),
            exception_type: text("exceptionType"),
            exception_message: text("exceptionMessage"),
            exception_line_number: number("exceptionLineNumber"),
            exception_cause: text("exceptionCause"),
            exception_stack: text("exceptionStack"),
            message: text("message"),
            details: raw("details"),
            record_context: raw("recordContext"),
            error: map.get("error").and_then(ErrorValue::from_field),
        }
    }
}

fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !is_blank(v))
}

/// `null`, `false`, `""` and `0` count as not given.
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<&str> for ArcInput {
    fn from(text: &str) -> Self {
        ArcInput::Text(text.to_string())
    }
}

impl From<String> for ArcInput {
    fn from(text: String) -> Self {
        ArcInput::Text(text)
    }
}

impl From<&String> for ArcInput {
    fn from(text: &String) -> Self {
        ArcInput::Text(text.clone())
    }
}

impl From<ErrorValue> for ArcInput {
    fn from(error: ErrorValue) -> Self {
        ArcInput::Error(error)
    }
}

impl From<PartialRecord> for ArcInput {
    fn from(partial: PartialRecord) -> Self {
        ArcInput::Partial(partial)
    }
}

/// Untyped input is classified by shape: error-like objects first, then
/// strings, then any other object as a partial arc.
impl From<Value> for ArcInput {
    fn from(value: Value) -> Self {
        if let Some(error) = ErrorValue::from_json(&value) {
            return ArcInput::Error(error);
        }
        match value {
            Value::String(text) => ArcInput::Text(text),
            Value::Object(map) => ArcInput::Partial(PartialRecord::from_json_lossy(&map)),
            other => ArcInput::Other(other),
        }
    }
}
