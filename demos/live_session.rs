// Live session demo: stream the microphone for ten seconds.
//
// Connects to a running stack, records one scripted segment, and prints
// whatever responses come back while the segment is transcribed.
//
// Prerequisites:
// - NATS server running: docker run -p 4222:4222 nats
// - An identity service answering identity.v1.login
// - A speech service consuming slu.v1.stream.> and publishing responses
//
// Usage: cargo run --example live_session -- <app-id>

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use slu_client::{ResponseSink, SessionConfig, SessionController};
use tokio::time::sleep;
use tracing::info;

struct PrintSink;

#[async_trait]
impl ResponseSink for PrintSink {
    async fn on_response(&self, message: serde_json::Value) {
        println!("{}", message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let app_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demo-app".to_string());

    let config = SessionConfig {
        app_id,
        ..SessionConfig::default()
    };

    let controller = SessionController::connect(config, Arc::new(PrintSink)).await?;

    info!("recording for 10 seconds; speak into your microphone");
    controller.start().await?;
    sleep(Duration::from_secs(10)).await;
    controller.stop();

    // Leave the stream open briefly so late responses still arrive.
    sleep(Duration::from_secs(3)).await;

    let stats = controller.stats();
    controller.shutdown().await?;

    info!(
        "done: {} frames sent across {} segments",
        stats.frames_sent, stats.segments_completed
    );
    Ok(())
}
