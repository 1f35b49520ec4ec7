//! Order record
//!
//! Orders are owned by the order-taking side of the system. Split billing only
//! reads their charges and patches the split-bill projection and settlement
//! fields.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use super::split_bill::SplitSummaryEntry;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub extra_items: Vec<ExtraItem>,
    pub subtotal: Option<Decimal>,
    pub gst: Option<Decimal>,
    pub sgst: Option<Decimal>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub has_split_bill: bool,
    pub split_bill_id: Option<Uuid>,
    #[serde(default)]
    pub split_bill_summary: Vec<SplitSummaryEntry>,
    pub payment_details: Option<OrderPaymentDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem { pub menu_id: Uuid, pub name: String, pub quantity: u32, pub item_total: Decimal }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraItem { pub name: String, pub total: Decimal }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus { #[default] Pending, Preparing, Ready, Served, Complete, Paid, Cancelled }

/// How the order as a whole was settled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderPaymentMethod { Cash, Card, Upi, Online, SplitBill }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPaymentDetails { pub method: OrderPaymentMethod, pub amount: Decimal, pub paid_at: DateTime<Utc> }

/// Partial update applied to an order. `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub has_split_bill: Option<bool>,
    pub split_bill_id: Option<Uuid>,
    pub split_bill_summary: Option<Vec<SplitSummaryEntry>>,
    pub payment_details: Option<OrderPaymentDetails>,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING", Self::Preparing => "PREPARING", Self::Ready => "READY",
            Self::Served => "SERVED", Self::Complete => "COMPLETE", Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Closed orders cannot be divided any more.
    pub fn is_closed(&self) -> bool { matches!(self, Self::Complete | Self::Paid | Self::Cancelled) }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = UnknownOrderStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending), "PREPARING" => Ok(Self::Preparing), "READY" => Ok(Self::Ready),
            "SERVED" => Ok(Self::Served), "COMPLETE" => Ok(Self::Complete), "PAID" => Ok(Self::Paid),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(UnknownOrderStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)] pub struct UnknownOrderStatus(pub String);
impl std::error::Error for UnknownOrderStatus {}
impl fmt::Display for UnknownOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Unknown order status '{}'", self.0) }
}

impl Order {
    /// New pending order with the given lines; totals are left to the caller.
    pub fn create(order_number: impl Into<String>, items: Vec<OrderItem>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), order_number: order_number.into(), status: OrderStatus::Pending,
            items, extra_items: vec![], subtotal: None, gst: None, sgst: None, total_amount: Decimal::ZERO,
            has_split_bill: false, split_bill_id: None, split_bill_summary: vec![], payment_details: None,
            created_at: now, updated_at: now,
        }
    }

    pub fn find_item(&self, menu_id: Uuid) -> Option<&OrderItem> { self.items.iter().find(|i| i.menu_id == menu_id) }

    pub fn apply(&mut self, patch: &OrderPatch) {
        if let Some(status) = patch.status { self.status = status; }
        if let Some(flag) = patch.has_split_bill { self.has_split_bill = flag; }
        if let Some(id) = patch.split_bill_id { self.split_bill_id = Some(id); }
        if let Some(summary) = &patch.split_bill_summary { self.split_bill_summary = summary.clone(); }
        if let Some(details) = &patch.payment_details { self.payment_details = Some(details.clone()); }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_patch_leaves_untouched_fields() {
        let mut order = Order::create("ORD-1", vec![]);
        order.apply(&OrderPatch { has_split_bill: Some(true), ..Default::default() });
        assert!(order.has_split_bill);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.payment_details.is_none());
    }
    #[test]
    fn test_status_round_trips_through_text() {
        for s in [OrderStatus::Pending, OrderStatus::Complete, OrderStatus::Paid, OrderStatus::Cancelled] {
            assert_eq!(s.as_str().parse::<OrderStatus>().unwrap(), s);
        }
        assert!("DONE".parse::<OrderStatus>().is_err());
        assert!(OrderStatus::Complete.is_closed());
        assert!(!OrderStatus::Served.is_closed());
    }
}
