use std::sync::Arc;

use anyhow::Context;

use agroplan_api::app::{build_app, AppServices};
use agroplan_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    agroplan_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let bind = config.bind;

    let services = tokio::task::spawn_blocking(move || AppServices::from_config(&config))
        .await
        .context("pipeline startup failed")?;
    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
