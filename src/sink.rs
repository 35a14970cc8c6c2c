use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for batches of [`LogRecord`]s.
///
/// Implementations own delivery to a concrete commit endpoint. The flush
/// scheduler calls `commit_arcs` from a background task and never waits
/// on it from the logging call site.
#[async_trait]
pub trait CommitSink: Send + Sync {
    /// Commit one batch.
    ///
    /// **Parameters**
    /// - `arcs`: the flushed arcs, in the order they were logged.
    ///   `details` is already serialized on every record.
    ///
    /// **Returns**
    /// - `Ok(())` if the endpoint accepted the batch.
    /// - `Err(..)` on network, serialization or status failures. The
    ///   scheduler logs the error and drops the batch; there is no retry.
    async fn commit_arcs(&self, arcs: Vec<LogRecord>) -> Result<(), Box<dyn Error + Send + Sync>>;
}
