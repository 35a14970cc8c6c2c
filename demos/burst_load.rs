use std::sync::Arc;
use std::time::Instant;

use arc_telemetry::context::StaticLocation;
use arc_telemetry::normalize::Normalizer;
use arc_telemetry::noop_sink::NoopSink;
use arc_telemetry::queue::QueueConfig;
use arc_telemetry::{ArcLogger, PartialRecord};
use tokio::time::Duration;

#[tokio::main]
async fn main() {
    let config = QueueConfig {
        max_batch_size: Some(1000),
        max_batch_age: Some(Duration::from_secs(5)),
        ..Default::default()
    };
    let normalizer = Normalizer::new(Arc::new(StaticLocation::new("https://load.local/")));
    let (logger, handle) = ArcLogger::spawn(Arc::new(NoopSink), normalizer, config);

    let n: u64 = 100_000;
    let start = Instant::now();
    for i in 0..n {
        // Half the arcs carry their own location and skip stack capture.
        if i % 2 == 0 {
            logger.error(format!("burst load error {}", i));
        } else {
            logger.error(PartialRecord {
                class_name: Some("load.burst".into()),
                line_number: Some(i as i64),
                ..PartialRecord::message("located burst load error")
            });
        }
    }
    let elapsed = start.elapsed();
    println!(
        "burst: logged {} arcs in {:?} (~{:.0} arcs/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    drop(logger);
    let _ = handle.await;
}
