use core_config::tracing::{init_tracing, install_color_eyre};
use eyre::WrapErr;
use tracing::info;

mod config;
mod openapi;
mod shutdown;
mod state;

use config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!(
        backend = %config.explore.vector_backend,
        dim = config.explore.embedding_dim,
        "Starting explore service"
    );

    let state = state::AppState::connect(&config).await?;
    let app = state.router();

    let listener = tokio::net::TcpListener::bind(config.server.address())
        .await
        .wrap_err_with(|| format!("failed to bind {}", config.server.address()))?;
    info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await
        .wrap_err("server error")?;

    info!("Explore service shutdown complete");
    Ok(())
}
