//! Restore `hasSplitBill`, `splitBillId` and `splitBillSummary` on every order
//! of every tenant database from its split bill.

use anyhow::{Context, Result};
use split_bill_engine::backfill::{backfill_split_summaries, BackfillReport};
use split_bill_engine::config::Config;
use split_bill_engine::SplitBillError;
use split_bill_engine::tenant::{PgTenantRegistry, TenantResolver};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let catalog = PgPoolOptions::new().max_connections(1).connect_with(config.database.clone()).await
        .context("cannot reach the catalog database")?;
    let databases: Vec<String> = sqlx::query_scalar("SELECT datname::text FROM pg_database WHERE starts_with(datname, $1) ORDER BY datname")
        .bind(&config.tenant_db_prefix).fetch_all(&catalog).await?;
    tracing::info!("Found {} tenant databases", databases.len());

    let registry = PgTenantRegistry::new(config.database.clone(), config.tenant_db_prefix.clone(), 2);
    let mut total = BackfillReport::default();
    for database in databases {
        let slug = &database[config.tenant_db_prefix.len()..];
        let ctx = match registry.resolve(slug).await {
            Ok(ctx) => ctx,
            Err(SplitBillError::Validation(reason)) => { tracing::warn!(database = %database, %reason, "Skipping database"); continue; }
            Err(e) => return Err(e).with_context(|| format!("cannot open tenant database {}", database)),
        };
        let report = backfill_split_summaries(&ctx).await.with_context(|| format!("backfill failed in {}", database))?;
        tracing::info!(database = %database, scanned = report.scanned, updated = report.updated, missing_orders = report.missing_orders, "Tenant processed");
        total.scanned += report.scanned;
        total.updated += report.updated;
        total.missing_orders += report.missing_orders;
    }

    tracing::info!(scanned = total.scanned, updated = total.updated, missing_orders = total.missing_orders, "✅ Backfill completed");
    Ok(())
}
