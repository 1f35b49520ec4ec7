//! Split-bill lifecycle: creation, payment recording, completion
//!
//! Each operation runs in one store transaction that first locks the parent
//! order, so the split bill and the order's summary are committed together and
//! concurrent writers on the same order are serialised.

use chrono::Utc;
use uuid::Uuid;
use crate::domain::aggregates::{Order, OrderPatch, OrderPaymentDetails, OrderPaymentMethod, OrderStatus, Split, SplitBill, SplitSummaryEntry};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{PaymentMethod, MAX_EQUAL_SPLITS, MIN_SPLITS};
use crate::proration::{self, SplitRequest};
use crate::store::StoreTransaction;
use crate::tenant::TenantContext;
use crate::{Result, SplitBillError};

/// Committed split bill plus the events raised while producing it.
#[derive(Debug)]
pub struct SplitBillCreated {
    pub split_bill: SplitBill,
    pub events: Vec<DomainEvent>,
}

#[derive(Debug)]
pub struct PaymentRecorded {
    pub split_bill: SplitBill,
    pub all_paid: bool,
    pub events: Vec<DomainEvent>,
}

fn ensure_splittable(order: &Order) -> Result<()> {
    if order.status.is_closed() { return Err(SplitBillError::OrderAlreadyCompleted(order.id)); }
    if order.has_split_bill { return Err(SplitBillError::AlreadySplit(order.id)); }
    Ok(())
}

async fn locked_order(tx: &mut dyn StoreTransaction, order_id: Uuid) -> Result<Order> {
    tx.lock_order(order_id).await?.ok_or(SplitBillError::OrderNotFound(order_id))
}

/// Persist a new bill over `splits` and point the order at it.
///
/// Runs inside the caller's transaction, which must hold the lock on `order`.
pub async fn create_split_bill(tx: &mut dyn StoreTransaction, order: &Order, splits: Vec<Split>) -> Result<SplitBill> {
    ensure_splittable(order)?;
    let split_bill = SplitBill::create(order.id, splits)?;
    tx.create_split_bill(&split_bill).await?;
    tx.update_order(order.id, &OrderPatch {
        has_split_bill: Some(true),
        split_bill_id: Some(split_bill.id()),
        split_bill_summary: Some(split_bill.summary()),
        ..Default::default()
    }).await?;
    Ok(split_bill)
}

async fn create_with(ctx: &TenantContext, order_id: Uuid, prorate: impl FnOnce(&Order) -> Result<Vec<Split>>) -> Result<SplitBillCreated> {
    let mut tx = ctx.store().begin().await?;
    let order = locked_order(tx.as_mut(), order_id).await?;
    // Closed or already-split orders fail before any proration error.
    ensure_splittable(&order)?;
    let splits = prorate(&order)?;
    let mut split_bill = create_split_bill(tx.as_mut(), &order, splits).await?;
    tx.commit().await?;

    tracing::info!(split_bill_id = %split_bill.id(), splits = split_bill.splits().len(), total = %split_bill.total_amount(), "Split bill created");
    let events = split_bill.take_events();
    Ok(SplitBillCreated { split_bill, events })
}

/// Divide an order by the items each diner takes.
#[tracing::instrument(skip(ctx, requests), fields(tenant = %ctx.slug()))]
pub async fn split_by_items(ctx: &TenantContext, order_id: Uuid, requests: &[SplitRequest]) -> Result<SplitBillCreated> {
    if requests.len() < MIN_SPLITS {
        return Err(SplitBillError::Validation(format!("at least {} splits required", MIN_SPLITS)));
    }
    if let Some(index) = requests.iter().position(|r| r.items.is_empty()) {
        return Err(SplitBillError::Validation(format!("split {} has no items", index + 1)));
    }
    create_with(ctx, order_id, |order| proration::split_by_items(order, requests)).await
}

/// Divide an order into `number_of_splits` identical shares.
#[tracing::instrument(skip(ctx), fields(tenant = %ctx.slug()))]
pub async fn split_equally(ctx: &TenantContext, order_id: Uuid, number_of_splits: u32) -> Result<SplitBillCreated> {
    if !(MIN_SPLITS as u32..=MAX_EQUAL_SPLITS).contains(&number_of_splits) {
        return Err(SplitBillError::Validation(format!("number of splits must be between {} and {}", MIN_SPLITS, MAX_EQUAL_SPLITS)));
    }
    create_with(ctx, order_id, |order| proration::split_equally(order, number_of_splits)).await
}

/// Order summary after `split_number` changed. Falls back to a full rebuild when
/// the stored summary has no entry for it.
fn synced_summary(order: &Order, split_bill: &SplitBill, split_number: u32) -> Vec<SplitSummaryEntry> {
    let mut summary = order.split_bill_summary.clone();
    let (Some(split), Some(index)) = (split_bill.split(split_number), summary.iter().position(|e| e.split_number == split_number)) else {
        return split_bill.summary();
    };
    summary[index].sync_with(split);
    summary
}

/// Settle one split; when it was the last unpaid one, close the bill and mark
/// the order paid.
#[tracing::instrument(skip(ctx, transaction_id), fields(tenant = %ctx.slug()))]
pub async fn record_payment(ctx: &TenantContext, split_bill_id: Uuid, split_number: u32, method: PaymentMethod, transaction_id: Option<String>) -> Result<PaymentRecorded> {
    let not_found = || SplitBillError::SplitBillNotFound(split_bill_id.to_string());
    let mut tx = ctx.store().begin().await?;
    let order_id = tx.find_split_bill(split_bill_id).await?.ok_or_else(not_found)?.original_order_id();
    let order = locked_order(tx.as_mut(), order_id).await?;
    // Re-read now that the order lock is held.
    let mut split_bill = tx.find_split_bill(split_bill_id).await?.ok_or_else(not_found)?;

    let paid_at = Utc::now();
    let all_paid = split_bill.record_payment(split_number, method, transaction_id, paid_at)?;

    let mut patch = OrderPatch { split_bill_summary: Some(synced_summary(&order, &split_bill, split_number)), ..Default::default() };
    if all_paid {
        patch.status = Some(OrderStatus::Paid);
        patch.payment_details = Some(OrderPaymentDetails { method: OrderPaymentMethod::SplitBill, amount: split_bill.total_amount(), paid_at });
    }
    tx.update_order(order_id, &patch).await?;
    tx.save_split_bill(&split_bill).await?;
    tx.commit().await?;

    tracing::info!(split_bill_id = %split_bill_id, split_number, method = %method, all_paid, "Split payment recorded");
    if all_paid {
        tracing::info!(split_bill_id = %split_bill_id, order_id = %order_id, amount = %split_bill.total_amount(), "Split bill completed, order paid");
    }
    let events = split_bill.take_events();
    Ok(PaymentRecorded { split_bill, all_paid, events })
}

/// Current split bill of an order.
pub async fn get_split_bill(ctx: &TenantContext, order_id: Uuid) -> Result<SplitBill> {
    ctx.store().split_bill_by_order(order_id).await?
        .ok_or_else(|| SplitBillError::SplitBillNotFound(format!("for order {}", order_id)))
}
