//! Service entry point: configuration from the environment, engine
//! discovery, background janitor, and the API server with signal-based
//! shutdown.

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use yt2mp3::{api, AudioConverter, Config, YtDlpEngine};

#[tokio::main]
async fn main() -> yt2mp3::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        output_dir = %config.conversion.output_dir.display(),
        bind_address = %config.server.bind_address,
        "Starting yt2mp3"
    );

    let engine = Arc::new(YtDlpEngine::from_config(&config.engine)?);
    let converter = Arc::new(AudioConverter::new(config, engine)?);
    let config = converter.config.clone();

    let janitor = converter.spawn_janitor();

    let server = {
        let converter = converter.clone();
        tokio::spawn(async move { api::start_api_server(converter, config).await })
    };

    yt2mp3::run_with_shutdown(converter).await;

    // The janitor would only notice the flag at its next tick; both
    // background tasks are torn down with the process
    server.abort();
    janitor.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}
