//! In-process store
//!
//! A transaction holds the tenant-wide lock for its whole life and edits a
//! working copy that replaces the shared state on commit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;
use crate::domain::aggregates::{Order, OrderPatch, SplitBill};
use crate::{Result, SplitBillError};
use super::{StoreTransaction, TenantStore};

#[derive(Clone, Debug, Default)]
struct MemoryState {
    orders: HashMap<Uuid, Order>,
    split_bills: HashMap<Uuid, SplitBill>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_order_updates: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub async fn insert_order(&self, order: Order) {
        self.state.lock().await.orders.insert(order.id, order);
    }

    pub async fn order(&self, id: Uuid) -> Option<Order> {
        self.state.lock().await.orders.get(&id).cloned()
    }

    pub async fn split_bill(&self, id: Uuid) -> Option<SplitBill> {
        self.state.lock().await.split_bills.get(&id).cloned()
    }

    /// Make every subsequent order update fail with a storage error.
    #[cfg(test)]
    pub fn fail_order_updates(&self, fail: bool) {
        self.fail_order_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryTransaction { guard, working, fail_order_updates: self.fail_order_updates.clone() }))
    }

    async fn split_bill_by_order(&self, order_id: Uuid) -> Result<Option<SplitBill>> {
        let state = self.state.lock().await;
        Ok(state.split_bills.values().find(|b| b.original_order_id() == order_id).cloned())
    }

    async fn split_bill_ids(&self) -> Result<Vec<Uuid>> {
        let state = self.state.lock().await;
        let mut bills: Vec<&SplitBill> = state.split_bills.values().collect();
        bills.sort_by_key(|b| b.created_at());
        Ok(bills.into_iter().map(|b| b.id()).collect())
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_order_updates: Arc<AtomicBool>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn update_order(&mut self, id: Uuid, patch: &OrderPatch) -> Result<()> {
        if self.fail_order_updates.load(Ordering::SeqCst) {
            return Err(SplitBillError::Storage("order store unavailable".into()));
        }
        let order = self.working.orders.get_mut(&id).ok_or(SplitBillError::OrderNotFound(id))?;
        order.apply(patch);
        Ok(())
    }

    async fn create_split_bill(&mut self, split_bill: &SplitBill) -> Result<()> {
        let order_id = split_bill.original_order_id();
        if self.working.split_bills.values().any(|b| b.original_order_id() == order_id) {
            return Err(SplitBillError::AlreadySplit(order_id));
        }
        let mut stored = split_bill.clone();
        stored.take_events();
        self.working.split_bills.insert(stored.id(), stored);
        Ok(())
    }

    async fn find_split_bill(&mut self, id: Uuid) -> Result<Option<SplitBill>> {
        Ok(self.working.split_bills.get(&id).cloned())
    }

    async fn save_split_bill(&mut self, split_bill: &SplitBill) -> Result<()> {
        let slot = self.working.split_bills.get_mut(&split_bill.id())
            .ok_or_else(|| SplitBillError::SplitBillNotFound(split_bill.id().to_string()))?;
        let mut stored = split_bill.clone();
        stored.take_events();
        *slot = stored;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { mut guard, working, .. } = *self;
        *guard = working;
        Ok(())
    }
}
