//! Shared helpers for integration tests

#![allow(dead_code)]

use arc_telemetry::context::StaticLocation;
use arc_telemetry::normalize::Normalizer;
use arc_telemetry::queue::QueueConfig;
use arc_telemetry::sink::CommitSink;
use arc_telemetry::{ArcLogger, LogRecord};
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const PAGE_URL: &str = "https://shop.local/cart";

/// Sink forwarding every committed batch, with its commit time, to a channel.
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<(Instant, Vec<LogRecord>)>,
}

#[async_trait]
impl CommitSink for RecordingSink {
    async fn commit_arcs(&self, arcs: Vec<LogRecord>) -> Result<(), Box<dyn Error + Send + Sync>> {
        let _ = self.tx.send((Instant::now(), arcs));
        Ok(())
    }
}

pub type Batches = mpsc::UnboundedReceiver<(Instant, Vec<LogRecord>)>;

pub fn recording_logger(config: QueueConfig) -> (ArcLogger, Batches) {
    let (tx, rx) = mpsc::unbounded_channel();
    let normalizer = Normalizer::new(Arc::new(StaticLocation::new(PAGE_URL)));
    let (logger, _handle) = ArcLogger::spawn(Arc::new(RecordingSink { tx }), normalizer, config);
    (logger, rx)
}

/// Flush and return the single batch that produced.
pub async fn flush_one(logger: &ArcLogger, batches: &mut Batches) -> Vec<LogRecord> {
    logger.flush().await;
    let (_, batch) = batches.try_recv().expect("flush should commit a batch");
    batch
}
