use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use binderscan::api::{self, AppState};
use binderscan::config::Config;
use binderscan::jobs::set_refresher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "binderscan=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting binderscan server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        model = %config.openai_model,
        vision_configured = config.openai_api_key.is_some(),
        "Configuration loaded successfully"
    );
    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set, scans will fail until it is configured");
    }

    // Build application state
    let state = AppState::from_config(config.clone())?;

    // Keep the set list warm
    let mut scheduler = if config.set_refresh_enabled {
        set_refresher::warm_set_cache(&state.resolver).await;
        let scheduler =
            set_refresher::start_set_refresher(state.resolver.clone(), config.set_cache_ttl())
                .await
                .map_err(|e| anyhow::anyhow!("Failed to start set refresher: {:?}", e))?;
        Some(scheduler)
    } else {
        None
    };

    let app = api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler
            .shutdown()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to stop set refresher: {:?}", e))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, cleaning up...");
}
