//! One-time batch job restoring the split-bill projection on orders
//!
//! Orders split before the projection existed carry no `split_bill_id` or
//! summary. The job rebuilds both from each split bill of a tenant.

use serde::Serialize;
use crate::domain::aggregates::OrderPatch;
use crate::tenant::TenantContext;
use crate::Result;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub scanned: usize,
    pub updated: usize,
    pub missing_orders: usize,
}

#[tracing::instrument(skip(ctx), fields(tenant = %ctx.slug()))]
pub async fn backfill_split_summaries(ctx: &TenantContext) -> Result<BackfillReport> {
    let mut report = BackfillReport::default();
    for split_bill_id in ctx.store().split_bill_ids().await? {
        report.scanned += 1;
        let mut tx = ctx.store().begin().await?;
        let Some(order_id) = tx.find_split_bill(split_bill_id).await?.map(|b| b.original_order_id()) else { continue };
        let Some(order) = tx.lock_order(order_id).await? else {
            tracing::warn!(split_bill_id = %split_bill_id, order_id = %order_id, "Split bill points at a missing order");
            report.missing_orders += 1;
            continue;
        };
        let Some(split_bill) = tx.find_split_bill(split_bill_id).await? else { continue };

        let summary = split_bill.summary();
        if order.has_split_bill && order.split_bill_id == Some(split_bill_id) && order.split_bill_summary == summary {
            continue;
        }
        tx.update_order(order_id, &OrderPatch {
            has_split_bill: Some(true),
            split_bill_id: Some(split_bill_id),
            split_bill_summary: Some(summary),
            ..Default::default()
        }).await?;
        tx.commit().await?;
        report.updated += 1;
        tracing::info!(order_number = %order.order_number, splits = split_bill.splits().len(), "Order summary restored");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;
    use crate::domain::aggregates::{Order, SplitBill};
    use crate::domain::value_objects::{PaymentMethod, PaymentStatus};
    use crate::lifecycle;
    use crate::store::{MemoryStore, TenantStore};

    #[tokio::test]
    async fn test_backfill_restores_projection() {
        let store = MemoryStore::new();
        let ctx = TenantContext::new("spice", Arc::new(store.clone()));
        let mut order = Order::create("ORD-5", vec![]);
        order.total_amount = Decimal::from(90);
        store.insert_order(order.clone()).await;

        let bill = lifecycle::split_equally(&ctx, order.id, 3).await.unwrap().split_bill;
        lifecycle::record_payment(&ctx, bill.id(), 2, PaymentMethod::Card, None).await.unwrap();

        // Simulate a pre-projection order.
        let legacy = store.order(order.id).await.unwrap();
        store.insert_order(Order { has_split_bill: false, split_bill_id: None, split_bill_summary: vec![], ..legacy }).await;

        let report = backfill_split_summaries(&ctx).await.unwrap();
        assert_eq!(report, BackfillReport { scanned: 1, updated: 1, missing_orders: 0 });

        let restored = store.order(order.id).await.unwrap();
        assert!(restored.has_split_bill);
        assert_eq!(restored.split_bill_id, Some(bill.id()));
        assert_eq!(restored.split_bill_summary.len(), 3);
        assert_eq!(restored.split_bill_summary[1].payment_status, PaymentStatus::Paid);
        assert_eq!(restored.split_bill_summary[1].payment_method, Some(PaymentMethod::Card));

        let again = backfill_split_summaries(&ctx).await.unwrap();
        assert_eq!(again, BackfillReport { scanned: 1, updated: 0, missing_orders: 0 });
    }

    #[tokio::test]
    async fn test_backfill_counts_orphans() {
        let store = MemoryStore::new();
        let ctx = TenantContext::new("spice", Arc::new(store.clone()));
        let split = crate::domain::aggregates::Split {
            split_number: 1, items: vec![], subtotal: Decimal::ONE, gst: Decimal::ZERO, sgst: Decimal::ZERO,
            total_amount: Decimal::ONE, payment_status: PaymentStatus::Pending, payment_details: None,
            customer_name: "Split 1".into(),
        };
        let orphan = SplitBill::restore(Uuid::now_v7(), Uuid::now_v7(), vec![split], Default::default(), Utc::now(), Utc::now());
        let mut tx = store.begin().await.unwrap();
        tx.create_split_bill(&orphan).await.unwrap();
        tx.commit().await.unwrap();

        let report = backfill_split_summaries(&ctx).await.unwrap();
        assert_eq!(report, BackfillReport { scanned: 1, updated: 0, missing_orders: 1 });
    }
}
