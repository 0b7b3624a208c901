use anyhow::Context;

use jobtrack_infra::{Config, JobService, store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jobtrack_observability::init();

    let config = Config::load().context("invalid configuration")?;

    let store = store::connect(config.database_url.as_deref())
        .await
        .context("failed to open entity store")?;
    let service = JobService::new(store, config.service_settings());

    let app = jobtrack_api::app::build_app(service);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
