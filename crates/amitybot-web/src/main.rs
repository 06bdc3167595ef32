//! AmityBot API server
//!
//! Run with: cargo run -p amitybot-web --bin amitybot-server

use std::sync::Arc;

use amitybot_common::Config;
use anyhow::Context;
use amitybot_web::{router::build_router, state::AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,amitybot_web=debug,amitybot_rag=debug")
            }),
        )
        .init();

    info!("Starting AmityBot API server...");

    let config = Config::load().context("loading configuration")?;
    let bind = config.server.bind.clone();

    let state = Arc::new(
        AppState::from_config(config)
            .await
            .context("building application state")?,
    );
    state.index_on_startup().await;

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!("🚀 Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
