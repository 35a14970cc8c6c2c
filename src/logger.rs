use crate::context::ContextLocation;
use crate::input::ArcInput;
use crate::normalize::Normalizer;
use crate::queue::{ArcQueue, QueueConfig, StatsSnapshot};
use crate::record::{LogLevel, LogRecord};
use crate::sink::CommitSink;
use once_cell::sync::OnceCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::task::JoinHandle;

static GLOBAL: OnceCell<ArcLogger> = OnceCell::new();

/// Caller-facing logging handle.
///
/// Cheap to clone; all clones feed the same queue. The leveled methods
/// are fire-and-forget: they return nothing and never panic back into
/// the caller, whatever the input looks like.
#[derive(Clone)]
pub struct ArcLogger {
    normalizer: Arc<Normalizer>,
    queue: ArcQueue,
}

impl ArcLogger {
    /// Build a logger around `sink` and spawn its flush scheduler on the
    /// current Tokio runtime.
    ///
    /// **Returns**
    /// - the logger handle
    /// - the scheduler's [`JoinHandle`], which completes after every
    ///   logger clone has been dropped and the last batch committed.
    pub fn spawn(sink: Arc<dyn CommitSink>, normalizer: Normalizer, config: QueueConfig) -> (Self, JoinHandle<()>) {
        let (queue, handle) = ArcQueue::spawn(sink, config);
        (
            ArcLogger {
                normalizer: Arc::new(normalizer),
                queue,
            },
            handle,
        )
    }

    /// Shorthand for [`spawn`](ArcLogger::spawn) with native call-site
    /// resolution and the default queue timing.
    pub fn with_location(sink: Arc<dyn CommitSink>, location: Arc<dyn ContextLocation>) -> (Self, JoinHandle<()>) {
        Self::spawn(sink, Normalizer::new(location), QueueConfig::default())
    }

    pub fn error(&self, input: impl Into<ArcInput>) {
        self.log(LogLevel::Error, input);
    }

    pub fn warn(&self, input: impl Into<ArcInput>) {
        self.log(LogLevel::Warn, input);
    }

    pub fn info(&self, input: impl Into<ArcInput>) {
        self.log(LogLevel::Info, input);
    }

    pub fn debug(&self, input: impl Into<ArcInput>) {
        self.log(LogLevel::Debug, input);
    }

    /// Log without choosing a level; the arc is recorded as `TRACE`.
    pub fn trace(&self, input: impl Into<ArcInput>) {
        self.log(LogLevel::default(), input);
    }

    /// Normalize `input` at `level` and queue it.
    ///
    /// A panic during normalization is caught and logged; that arc is
    /// dropped and the caller carries on.
    pub fn log(&self, level: LogLevel, input: impl Into<ArcInput>) {
        let normalizer = &self.normalizer;
        let built = panic::catch_unwind(AssertUnwindSafe(|| normalizer.normalize(level, input.into())));

        match built {
            Ok(record) => self.queue.enqueue(record),
            Err(_) => tracing::error!(level = %level, "arc normalization panicked, arc dropped"),
        }
    }

    /// Queue an already normalized arc as-is.
    pub fn enqueue(&self, record: LogRecord) {
        self.queue.enqueue(record);
    }

    /// Commit everything buffered now instead of waiting for the timer.
    pub async fn flush(&self) {
        self.queue.flush().await;
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.queue.stats()
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}

/// Install `logger` as the process-wide logger used by the free functions
/// [`error`], [`warn`], [`info`] and [`debug`].
///
/// Only the first call wins; later calls hand their logger back.
pub fn set_global(logger: ArcLogger) -> Result<(), ArcLogger> {
    GLOBAL.set(logger)
}

pub fn global() -> Option<&'static ArcLogger> {
    GLOBAL.get()
}

fn with_global(level: LogLevel, input: ArcInput) {
    match GLOBAL.get() {
        Some(logger) => logger.log(level, input),
        None => tracing::debug!(level = %level, "no global arc logger installed, arc dropped"),
    }
}

pub fn error(input: impl Into<ArcInput>) {
    with_global(LogLevel::Error, input.into());
}

pub fn warn(input: impl Into<ArcInput>) {
    with_global(LogLevel::Warn, input.into());
}

pub fn info(input: impl Into<ArcInput>) {
    with_global(LogLevel::Info, input.into());
}

pub fn debug(input: impl Into<ArcInput>) {
    with_global(LogLevel::Debug, input.into());
}
