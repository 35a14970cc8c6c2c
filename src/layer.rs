use crate::input::{ErrorValue, PartialRecord};
use crate::logger::ArcLogger;
use crate::record::LogLevel;
use serde_json::{Map, Value};
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns `tracing` events into arcs.
///
/// Events at or above `min_level` are forwarded to an [`ArcLogger`]:
/// event fields become `details`, the `message` field becomes the arc
/// message, and the event's module path and line are passed as the call
/// site, so no stack capture happens on this path. Events emitted by this
/// crate are ignored to keep its own diagnostics out of the queue.
pub struct ArcLayer {
    logger: ArcLogger,
    min_level: Level,
    /// Events observed by the layer, before level filtering.
    pub seen_events: Arc<AtomicU64>,
    /// Events handed to the logger.
    pub forwarded_events: Arc<AtomicU64>,
}

impl ArcLayer {
    pub fn new(logger: ArcLogger, min_level: Level) -> Self {
        Self {
            logger,
            min_level,
            seen_events: Arc::new(AtomicU64::new(0)),
            forwarded_events: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<S> Layer<S> for ArcLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.seen_events.fetch_add(1, Ordering::Relaxed);

        let meta = event.metadata();
        if *meta.level() > self.min_level || meta.target().starts_with(env!("CARGO_CRATE_NAME")) {
            return;
        }

        let mut fields = Map::new();
        let mut message: Option<String> = None;
        let mut error: Option<ErrorValue> = None;

        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
            error: &mut error,
        };
        event.record(&mut visitor);

        let partial = PartialRecord {
            class_name: Some(meta.module_path().unwrap_or_else(|| meta.target()).to_string()),
            line_number: meta.line().map(i64::from),
            message,
            details: Some(Value::Object(fields)),
            error,
            ..Default::default()
        };

        self.logger.log(LogLevel::from(*meta.level()), partial);
        self.forwarded_events.fetch_add(1, Ordering::Relaxed);
    }
}

/// Collects event fields into a JSON map, pulling out `message` and the
/// first error-typed field.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut Map<String, Value>,
    pub message: &'a mut Option<String>,
    pub error: &'a mut Option<ErrorValue>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        if self.error.is_none() {
            *self.error = Some(ErrorValue::from_error(value));
        }
        self.fields.insert(field.name().to_string(), Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), Value::String(format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticLocation;
    use crate::normalize::Normalizer;
    use crate::queue::QueueConfig;
    use crate::record::LogRecord;
    use crate::sink::CommitSink;
    use async_trait::async_trait;
    use std::fmt;
    use tokio::sync::mpsc;
    use tracing_subscriber::layer::SubscriberExt;

    struct ChannelSink(mpsc::UnboundedSender<Vec<LogRecord>>);

    #[async_trait]
    impl CommitSink for ChannelSink {
        async fn commit_arcs(&self, arcs: Vec<LogRecord>) -> Result<(), Box<dyn Error + Send + Sync>> {
            let _ = self.0.send(arcs);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Timeout;

    impl fmt::Display for Timeout {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("upstream timed out")
        }
    }

    impl Error for Timeout {}

    #[tokio::test]
    async fn events_become_located_arcs() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (logger, _handle) = ArcLogger::spawn(
            Arc::new(ChannelSink(tx)),
            Normalizer::new(Arc::new(StaticLocation::new("https://app.local/"))),
            QueueConfig::default(),
        );
        let layer = ArcLayer::new(logger.clone(), Level::WARN);
        let forwarded = Arc::clone(&layer.forwarded_events);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "checkout", "too chatty");
            let err = Timeout;
            tracing::error!(target: "checkout", order_id = 17u64, error = &err as &(dyn Error + 'static), "payment failed");
        });
        logger.flush().await;

        let batch = rx.recv().await.unwrap();
        assert_eq!(forwarded.load(Ordering::Relaxed), 1);
        assert_eq!(batch.len(), 1);

        let arc = &batch[0];
        assert_eq!(arc.log_level, LogLevel::Error);
        assert_eq!(arc.message.as_deref(), Some("payment failed"));
        assert_eq!(arc.exception_message.as_deref(), Some("upstream timed out"));
        assert!(arc.line_number.is_some());
        assert!(arc.stack_trace.is_none());
        assert!(arc.details.starts_with(r#"{"order_id":17,"#));
        assert!(arc.details.ends_with(r#""_url":"https://app.local/"}"#));
    }
}
