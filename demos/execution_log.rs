use std::time::Instant;
use tracing::info;

use metrics_log_router::init::init_logger_from_env;
use metrics_log_router::record::MetricsPayload;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let guard = init_logger_from_env().await?;

    info!("performance run started");

    let hosts = ["node-1", "node-2", "node-3"];
    let start = Instant::now();

    for (i, host) in hosts.iter().enumerate() {
        let payload = MetricsPayload::new("latency", *host, format!("{}ms", 100 + i * 10));
        info!(message = %payload.to_message());
    }

    info!(elapsed_ms = start.elapsed().as_millis() as u64, "performance run finished");

    // Drain the metrics router and flush the execution log before exiting
    guard.shutdown().await;
    Ok(())
}
