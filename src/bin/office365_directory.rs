use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use wazo_microsoft::{
    config::DirectoryConfig,
    routes::directory_router,
    services::office365::source::{load_source_configs, Office365Source},
    telemetry::init_tracing,
    DirectoryState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing().context("failed to install tracing subscriber")?;

    let config = DirectoryConfig::from_env().context("invalid configuration")?;
    let sources = load_source_configs(&config.sources_path)?
        .into_iter()
        .map(Office365Source::load)
        .collect::<Result<Vec<_>, _>>()
        .context("failed to load Office365 sources")?;
    for source in &sources {
        info!(source = %source.name(), "loaded Office365 source");
    }

    let app = directory_router(DirectoryState::new(sources));
    let listener = TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;
    info!("directory listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;

    Ok(())
}
