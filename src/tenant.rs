//! Tenant scoping
//!
//! Every restaurant owns an isolated database. Callers resolve a
//! [`TenantContext`] once per request and hand it to the engine, which never
//! looks tenancy up on its own.

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tokio::sync::RwLock;
use crate::store::{MemoryStore, PgStore, TenantStore};
use crate::{Result, SplitBillError};

/// Storage handles already scoped to one restaurant.
#[derive(Clone)]
pub struct TenantContext {
    slug: String,
    store: Arc<dyn TenantStore>,
}

impl TenantContext {
    pub fn new(slug: impl Into<String>, store: Arc<dyn TenantStore>) -> Self { Self { slug: slug.into(), store } }
    pub fn slug(&self) -> &str { &self.slug }
    pub fn store(&self) -> &dyn TenantStore { self.store.as_ref() }
}

impl std::fmt::Debug for TenantContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantContext").field("slug", &self.slug).finish_non_exhaustive()
    }
}

#[async_trait]
pub trait TenantResolver: Send + Sync {
    async fn resolve(&self, slug: &str) -> Result<TenantContext>;
}

/// Slugs are lowercase ASCII letters, digits, `-` and `_`, at most 63 long.
pub fn validate_slug(slug: &str) -> Result<()> {
    let ok = !slug.is_empty() && slug.len() <= 63
        && slug.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
    if ok { Ok(()) } else { Err(SplitBillError::Validation(format!("invalid restaurant slug '{}'", slug))) }
}

/// Connects to `{prefix}{slug}` on the server of the base connection, lazily,
/// migrating each tenant database on first use.
pub struct PgTenantRegistry {
    base: PgConnectOptions,
    prefix: String,
    max_connections: u32,
    pools: RwLock<HashMap<String, PgStore>>,
}

impl PgTenantRegistry {
    pub fn new(base: PgConnectOptions, prefix: impl Into<String>, max_connections: u32) -> Self {
        Self { base, prefix: prefix.into(), max_connections, pools: RwLock::new(HashMap::new()) }
    }

    pub fn database_name(&self, slug: &str) -> String { format!("{}{}", self.prefix, slug) }

    /// Connects and migrates without holding the pool map lock, so a slow or
    /// unreachable tenant database never stalls the other tenants. When two
    /// requests race on a new tenant the first inserted pool is kept.
    async fn store(&self, slug: &str) -> Result<PgStore> {
        if let Some(store) = self.pools.read().await.get(slug).cloned() {
            return Ok(store);
        }
        let database = self.database_name(slug);
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect_with(self.base.clone().database(&database))
            .await?;
        let store = PgStore::new(pool);
        store.migrate().await?;
        tracing::info!(tenant = %slug, database = %database, "Tenant database connected");
        Ok(self.pools.write().await.entry(slug.to_string()).or_insert(store).clone())
    }
}

#[async_trait]
impl TenantResolver for PgTenantRegistry {
    async fn resolve(&self, slug: &str) -> Result<TenantContext> {
        validate_slug(slug)?;
        let store = self.store(slug).await?;
        Ok(TenantContext::new(slug, Arc::new(store)))
    }
}

/// In-process tenants, created on first reference.
#[derive(Default)]
pub struct MemoryTenants {
    stores: RwLock<HashMap<String, MemoryStore>>,
}

impl MemoryTenants {
    pub fn new() -> Self { Self::default() }

    pub async fn store(&self, slug: &str) -> MemoryStore {
        self.stores.write().await.entry(slug.to_string()).or_default().clone()
    }
}

#[async_trait]
impl TenantResolver for MemoryTenants {
    async fn resolve(&self, slug: &str) -> Result<TenantContext> {
        validate_slug(slug)?;
        Ok(TenantContext::new(slug, Arc::new(self.store(slug).await)))
    }
}
