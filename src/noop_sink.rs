use crate::record::LogRecord;
use crate::sink::CommitSink;
use async_trait::async_trait;
use std::error::Error;

/// A sink that simply drops every batch.
///
/// Useful for measuring the overhead of normalization and batching
/// without any I/O, and for tests that don't care about delivery.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl CommitSink for NoopSink {
    async fn commit_arcs(&self, _arcs: Vec<LogRecord>) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
