use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::response::IntoResponse;
use reqwest::Client;
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tracing::{info, warn};

use wazo_microsoft::{
    config::Config,
    db::in_memory_external_auth_repository::InMemoryExternalAuthRepository,
    responses::JsonResponse,
    routes::auth_router,
    services::oauth::{coordinator::AuthorizationCoordinator, microsoft::client::MicrosoftOAuthClient},
    telemetry::init_tracing,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing().context("failed to install tracing subscriber")?;

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        bind_address = %config.bind_address,
        reauthorize_policy = %config.microsoft.reauthorize_policy,
        "starting Microsoft external auth service"
    );

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(config.rate_limit.per_millisecond)
            .burst_size(config.rate_limit.burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .context("invalid rate limiter settings")?,
    );

    // Background task to cleanup old IPs
    let governor_limiter = governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = std::time::Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            governor_limiter.retain_recent();
        }
    });

    let oauth = Arc::new(MicrosoftOAuthClient {
        client: Client::new(),
    });
    let state = AppState::new(
        Arc::new(InMemoryExternalAuthRepository::new()),
        oauth,
        config.microsoft,
        config.jwt_keys,
    );
    let coordinator = state.coordinator.clone();

    let app = auth_router(state).layer(GovernorLayer {
        config: governor_conf,
    });
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();

    let listener = TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;
    info!("listening on http://{}", config.bind_address);

    axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown_signal(coordinator))
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal(coordinator: AuthorizationCoordinator) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
    coordinator.shutdown();
}
