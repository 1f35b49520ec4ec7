//! Split-Bill Engine - multi-tenant split billing API

use anyhow::Result;
use split_bill_engine::config::Config;
use split_bill_engine::http::{router, AppState};
use split_bill_engine::tenant::PgTenantRegistry;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let tenants = PgTenantRegistry::new(config.database.clone(), config.tenant_db_prefix.clone(), config.max_connections);
    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable, events will not be published"); None }
        },
        None => None,
    };
    let app = router(AppState { tenants: Arc::new(tenants), nats });

    tracing::info!("🚀 Split-Bill Engine listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?, app).await?;
    Ok(())
}
