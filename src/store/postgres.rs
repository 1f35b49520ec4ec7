//! Postgres store, one database per tenant

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::migrate::Migrator;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;
use crate::domain::aggregates::{ExtraItem, Order, OrderItem, OrderPatch, OrderPaymentDetails, Split, SplitBill, SplitSummaryEntry};
use crate::{Result, SplitBillError};
use super::{StoreTransaction, TenantStore};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct PgStore { pool: PgPool }

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid, order_number: String, status: String,
    items: Json<Vec<OrderItem>>, extra_items: Json<Vec<ExtraItem>>,
    subtotal: Option<Decimal>, gst: Option<Decimal>, sgst: Option<Decimal>, total_amount: Decimal,
    has_split_bill: bool, split_bill_id: Option<Uuid>, split_bill_summary: Json<Vec<SplitSummaryEntry>>,
    payment_details: Option<Json<OrderPaymentDetails>>,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = SplitBillError;
    fn try_from(r: OrderRow) -> Result<Self> {
        Ok(Order {
            id: r.id, order_number: r.order_number,
            status: r.status.parse().map_err(|e| SplitBillError::Storage(format!("order {}: {}", r.id, e)))?,
            items: r.items.0, extra_items: r.extra_items.0,
            subtotal: r.subtotal, gst: r.gst, sgst: r.sgst, total_amount: r.total_amount,
            has_split_bill: r.has_split_bill, split_bill_id: r.split_bill_id, split_bill_summary: r.split_bill_summary.0,
            payment_details: r.payment_details.map(|d| d.0),
            created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SplitBillRow {
    id: Uuid, original_order_id: Uuid, splits: Json<Vec<Split>>, status: String,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<SplitBillRow> for SplitBill {
    type Error = SplitBillError;
    fn try_from(r: SplitBillRow) -> Result<Self> {
        Ok(SplitBill::restore(r.id, r.original_order_id, r.splits.0, r.status.parse()?, r.created_at, r.updated_at))
    }
}

#[async_trait]
impl TenantStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        Ok(Box::new(PgTransaction { tx: self.pool.begin().await? }))
    }

    async fn split_bill_by_order(&self, order_id: Uuid) -> Result<Option<SplitBill>> {
        sqlx::query_as::<_, SplitBillRow>("SELECT * FROM split_bills WHERE original_order_id = $1")
            .bind(order_id).fetch_optional(&self.pool).await?
            .map(SplitBill::try_from).transpose()
    }

    async fn split_bill_ids(&self) -> Result<Vec<Uuid>> {
        Ok(sqlx::query_scalar::<_, Uuid>("SELECT id FROM split_bills ORDER BY created_at").fetch_all(&self.pool).await?)
    }
}

struct PgTransaction { tx: Transaction<'static, Postgres> }

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id).fetch_optional(&mut *self.tx).await?
            .map(Order::try_from).transpose()
    }

    async fn update_order(&mut self, id: Uuid, patch: &OrderPatch) -> Result<()> {
        let done = sqlx::query(
            "UPDATE orders SET status = COALESCE($2, status), has_split_bill = COALESCE($3, has_split_bill), \
             split_bill_id = COALESCE($4, split_bill_id), split_bill_summary = COALESCE($5, split_bill_summary), \
             payment_details = COALESCE($6, payment_details), updated_at = NOW() WHERE id = $1")
            .bind(id).bind(patch.status.map(|s| s.as_str())).bind(patch.has_split_bill).bind(patch.split_bill_id)
            .bind(patch.split_bill_summary.as_ref().map(Json)).bind(patch.payment_details.as_ref().map(Json))
            .execute(&mut *self.tx).await?;
        if done.rows_affected() == 0 { return Err(SplitBillError::OrderNotFound(id)); }
        Ok(())
    }

    async fn create_split_bill(&mut self, split_bill: &SplitBill) -> Result<()> {
        let order_id = split_bill.original_order_id();
        sqlx::query("INSERT INTO split_bills (id, original_order_id, splits, status, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(split_bill.id()).bind(order_id).bind(Json(split_bill.splits())).bind(split_bill.status().as_str())
            .bind(split_bill.created_at()).bind(split_bill.updated_at())
            .execute(&mut *self.tx).await
            .map_err(|e| {
                if let sqlx::Error::Database(db) = &e {
                    if db.is_unique_violation() { return SplitBillError::AlreadySplit(order_id); }
                }
                SplitBillError::from(e)
            })?;
        Ok(())
    }

    async fn find_split_bill(&mut self, id: Uuid) -> Result<Option<SplitBill>> {
        sqlx::query_as::<_, SplitBillRow>("SELECT * FROM split_bills WHERE id = $1")
            .bind(id).fetch_optional(&mut *self.tx).await?
            .map(SplitBill::try_from).transpose()
    }

    async fn save_split_bill(&mut self, split_bill: &SplitBill) -> Result<()> {
        let done = sqlx::query("UPDATE split_bills SET splits = $2, status = $3, updated_at = $4 WHERE id = $1")
            .bind(split_bill.id()).bind(Json(split_bill.splits())).bind(split_bill.status().as_str()).bind(split_bill.updated_at())
            .execute(&mut *self.tx).await?;
        if done.rows_affected() == 0 { return Err(SplitBillError::SplitBillNotFound(split_bill.id().to_string())); }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
