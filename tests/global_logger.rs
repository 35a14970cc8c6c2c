mod common;

use arc_telemetry::logger;
use arc_telemetry::queue::QueueConfig;
use common::recording_logger;

#[tokio::test]
async fn free_functions_route_to_the_installed_logger() {
    arc_telemetry::info("before install");
    assert!(logger::global().is_none());

    let (installed, mut batches) = recording_logger(QueueConfig::default());
    assert!(logger::set_global(installed.clone()).is_ok());

    let (second, _) = recording_logger(QueueConfig::default());
    assert!(logger::set_global(second).is_err());

    arc_telemetry::error("e");
    arc_telemetry::warn("w");
    arc_telemetry::info("i");
    arc_telemetry::debug("d");
    installed.flush().await;

    let (_, batch) = batches.try_recv().unwrap();
    let messages: Vec<&str> = batch.iter().filter_map(|a| a.message.as_deref()).collect();
    assert_eq!(messages, vec!["e", "w", "i", "d"]);
}
