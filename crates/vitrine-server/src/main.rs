use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitrine_server::config::{build_backend, ServerConfig};
use vitrine_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitrine_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load()?;
    tracing::info!(backend = ?config.storage.backend, "starting vitrine");

    let backend = build_backend(&config.storage).await?;
    let state = Arc::new(AppState::new_with_token(backend, config.admin_token.clone()));

    if state.admin_token.is_none() {
        tracing::warn!("no admin token configured, mutating endpoints are open");
    }

    let app = vitrine_server::create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
