//! Domain events
use crate::domain::value_objects::PaymentMethod;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    SplitBill(SplitBillEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SplitBillEvent {
    Created { split_bill_id: Uuid, order_id: Uuid, splits: u32, total_amount: Decimal },
    SplitPaid { split_bill_id: Uuid, split_number: u32, method: PaymentMethod, amount: Decimal },
    Completed { split_bill_id: Uuid, order_id: Uuid, amount: Decimal },
}

impl DomainEvent {
    /// Last segment of the subject the event is published under.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SplitBill(SplitBillEvent::Created { .. }) => "created",
            Self::SplitBill(SplitBillEvent::SplitPaid { .. }) => "split_paid",
            Self::SplitBill(SplitBillEvent::Completed { .. }) => "completed",
        }
    }
}
