use arc_telemetry::init::init_from_env;
use arc_telemetry::ErrorValue;
use std::io;
use tracing::error;

fn place_order(message: &str, fail: bool) -> Result<(), io::Error> {
    if fail {
        Err(io::Error::new(io::ErrorKind::Other, message.to_string()))
    } else {
        Ok(())
    }
}

/// Configure with e.g.
/// `ARC_COMMIT_DSN=https://telemetry.local/arcs ARC_CONTEXT_URL=https://shop.local/cart`.
/// Without `ARC_COMMIT_DSN` batches go to a no-op sink.
#[tokio::main]
async fn main() {
    let logger = match init_from_env() {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("could not initialize arc logging: {}", e);
            return;
        }
    };

    for (message, fail) in [("order accepted", false), ("card declined", true)] {
        match place_order(message, fail) {
            Ok(()) => arc_telemetry::info(message),
            Err(e) => arc_telemetry::error(ErrorValue::from_error(&e)),
        }
    }

    // Forwarded through the tracing layer as well.
    error!(order_id = 17u64, "inventory out of sync");

    logger.flush().await;
    let stats = logger.stats();
    println!(
        "enqueued {} arcs, committed {} in {} batches",
        stats.enqueued, stats.committed_records, stats.committed_batches
    );
}
