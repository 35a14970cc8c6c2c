use std::sync::Arc;

use arc_telemetry::context::StaticLocation;
use arc_telemetry::sink::CommitSink;
use arc_telemetry::{ArcLogger, LogRecord, PartialRecord};
use async_trait::async_trait;
use serde_json::json;

/// Example of integrating a custom commit endpoint by implementing
/// `CommitSink` directly. Here every batch is printed as JSON lines.
struct StdoutSink;

#[async_trait]
impl CommitSink for StdoutSink {
    async fn commit_arcs(&self, arcs: Vec<LogRecord>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        println!("[stdout-sink] batch of {}", arcs.len());
        for arc in &arcs {
            println!("{}", serde_json::to_string(arc)?);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let location = Arc::new(StaticLocation::new("https://shop.local/"));
    let (logger, handle) = ArcLogger::with_location(Arc::new(StdoutSink), location.clone());

    logger.info("custom sink example started");
    location.set("https://shop.local/checkout");
    logger.warn(PartialRecord {
        details: Some(json!({"cartSize": 3})),
        record_context: Some(json!("order-17")),
        ..PartialRecord::message("slow checkout")
    });

    // Dropping the only handle commits the buffered arcs and stops the scheduler.
    drop(logger);
    let _ = handle.await;
}
