//! SplitBill Aggregate
//!
//! Holds every split derived from one order. Splits only change through
//! [`SplitBill::record_payment`]; the bill moves `ACTIVE -> COMPLETED` once, when
//! the last unpaid split is settled.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::events::{DomainEvent, SplitBillEvent};
use crate::domain::value_objects::{PaymentDetails, PaymentMethod, PaymentStatus};
use crate::{Result, SplitBillError};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitBill {
    id: Uuid,
    original_order_id: Uuid,
    splits: Vec<Split>,
    status: SplitBillStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    pub split_number: u32,
    #[serde(default)]
    pub items: Vec<SplitItem>,
    pub subtotal: Decimal,
    pub gst: Decimal,
    pub sgst: Decimal,
    pub total_amount: Decimal,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<PaymentDetails>,
    pub customer_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitItem { pub menu_id: Uuid, pub name: String, pub quantity: u32, pub item_total: Decimal }

/// Projection of one split embedded in the order for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitSummaryEntry {
    pub split_number: u32,
    pub customer_name: String,
    pub total_amount: Decimal,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitBillStatus { #[default] Active, Completed }

impl Split {
    pub fn default_customer_name(split_number: u32) -> String { format!("Split {}", split_number) }
}

impl From<&Split> for SplitSummaryEntry {
    fn from(split: &Split) -> Self {
        Self {
            split_number: split.split_number,
            customer_name: split.customer_name.clone(),
            total_amount: split.total_amount,
            payment_status: split.payment_status,
            payment_method: split.payment_details.as_ref().map(|d| d.method),
            paid_at: split.payment_details.as_ref().map(|d| d.paid_at),
        }
    }
}

impl SplitSummaryEntry {
    /// Copy the settlement state of `split` onto this entry.
    pub fn sync_with(&mut self, split: &Split) {
        self.payment_status = split.payment_status;
        self.payment_method = split.payment_details.as_ref().map(|d| d.method);
        self.paid_at = split.payment_details.as_ref().map(|d| d.paid_at);
    }
}

impl SplitBillStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "ACTIVE", Self::Completed => "COMPLETED" }
    }
}

impl fmt::Display for SplitBillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SplitBillStatus {
    type Err = SplitBillError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(SplitBillError::Storage(format!("unknown split bill status '{}'", other))),
        }
    }
}

impl SplitBill {
    /// Open a new bill over `splits`. Split numbers must be exactly `1..=N`;
    /// every split starts unpaid.
    pub fn create(original_order_id: Uuid, mut splits: Vec<Split>) -> Result<Self> {
        if splits.is_empty() { return Err(SplitBillError::Validation("a split bill needs at least one split".into())); }
        splits.sort_by_key(|s| s.split_number);
        for (index, split) in splits.iter_mut().enumerate() {
            if split.split_number as usize != index + 1 {
                return Err(SplitBillError::Validation(format!("split numbers must run 1..={} without gaps or repeats", index + 1)));
            }
            split.payment_status = PaymentStatus::Pending;
            split.payment_details = None;
        }
        let now = Utc::now();
        let mut bill = Self {
            id: Uuid::now_v7(), original_order_id, splits, status: SplitBillStatus::Active,
            created_at: now, updated_at: now, events: vec![],
        };
        let total_amount = bill.total_amount();
        bill.raise_event(DomainEvent::SplitBill(SplitBillEvent::Created {
            split_bill_id: bill.id, order_id: original_order_id, splits: bill.splits.len() as u32, total_amount,
        }));
        Ok(bill)
    }

    /// Rebuild a persisted bill. No events are raised.
    pub fn restore(id: Uuid, original_order_id: Uuid, splits: Vec<Split>, status: SplitBillStatus, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        Self { id, original_order_id, splits, status, created_at, updated_at, events: vec![] }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn original_order_id(&self) -> Uuid { self.original_order_id }
    pub fn splits(&self) -> &[Split] { &self.splits }
    pub fn status(&self) -> SplitBillStatus { self.status }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn split(&self, split_number: u32) -> Option<&Split> { self.splits.iter().find(|s| s.split_number == split_number) }
    pub fn total_amount(&self) -> Decimal { self.splits.iter().map(|s| s.total_amount).sum() }
    pub fn is_fully_paid(&self) -> bool { self.splits.iter().all(|s| s.payment_status.is_paid()) }
    pub fn summary(&self) -> Vec<SplitSummaryEntry> { self.splits.iter().map(SplitSummaryEntry::from).collect() }

    /// Settle one split. Returns whether every split is now paid.
    pub fn record_payment(&mut self, split_number: u32, method: PaymentMethod, transaction_id: Option<String>, paid_at: DateTime<Utc>) -> Result<bool> {
        let split_bill_id = self.id;
        let split = self.splits.iter_mut().find(|s| s.split_number == split_number)
            .ok_or(SplitBillError::SplitNotFound { split_bill_id, split_number })?;
        if split.payment_status.is_paid() {
            return Err(SplitBillError::AlreadyPaid { split_bill_id, split_number });
        }
        split.payment_status = PaymentStatus::Paid;
        split.payment_details = Some(PaymentDetails { method, transaction_id, paid_at });
        let amount = split.total_amount;
        self.touch();
        self.raise_event(DomainEvent::SplitBill(SplitBillEvent::SplitPaid { split_bill_id, split_number, method, amount }));

        let all_paid = self.is_fully_paid();
        if all_paid && self.status == SplitBillStatus::Active {
            self.status = SplitBillStatus::Completed;
            let amount = self.total_amount();
            self.raise_event(DomainEvent::SplitBill(SplitBillEvent::Completed { split_bill_id, order_id: self.original_order_id, amount }));
        }
        Ok(all_paid)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
