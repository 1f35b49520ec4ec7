//! Persistence seams for the order and split-bill documents
//!
//! The engine only talks to these traits. Every write goes through a
//! [`StoreTransaction`]: both documents change together or not at all, and the
//! order row lock serialises writers per order.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::aggregates::{Order, OrderPatch, SplitBill};
use crate::Result;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// One tenant's storage.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    async fn split_bill_by_order(&self, order_id: Uuid) -> Result<Option<SplitBill>>;

    async fn split_bill_ids(&self) -> Result<Vec<Uuid>>;
}

/// Unit of work. Dropping it without [`StoreTransaction::commit`] discards every change.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Load the order and hold its lock until the transaction ends.
    async fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>>;

    async fn update_order(&mut self, id: Uuid, patch: &OrderPatch) -> Result<()>;

    async fn create_split_bill(&mut self, split_bill: &SplitBill) -> Result<()>;

    async fn find_split_bill(&mut self, id: Uuid) -> Result<Option<SplitBill>>;

    async fn save_split_bill(&mut self, split_bill: &SplitBill) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
