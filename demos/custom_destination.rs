use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use metrics_log_router::{
    console::SummaryWriter,
    init::{init_tracing_with_config, LayerConfig},
    record::{metrics_message, LogRecord},
    router::MetricsRouter,
    sink::LogSink,
};

/// Metrics destination implemented directly on top of `LogSink`. Imagine
/// this pushes to a dashboard instead of a local file.
struct DashboardSink;

#[async_trait]
impl LogSink for DashboardSink {
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        println!("[dashboard] {}", serde_json::to_string(record)?);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let router = MetricsRouter::new(Arc::new(DashboardSink), SummaryWriter::Stdout);
    let guard = init_tracing_with_config(Arc::new(router), LayerConfig::default())?;

    info!("not a metric, ignored by the router");
    info!(message = %metrics_message("throughput", "node-7", "950 rps"));

    guard.shutdown().await;
    Ok(())
}
