use esp_stream_recorder::{RecorderConfig, RecorderServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Init Logging, RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    info!("Starting ESP32 audio stream recorder...");

    let config = RecorderConfig::from_env()?;
    config.log_summary();

    let server = RecorderServer::bind(&config).await?;
    info!("WebSocket server running on ws://{}", server.local_addr()?);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}
