//! Value Objects for split billing

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance for monetary comparisons (0.000001)
pub const MONEY_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

/// Fewest splits a bill can be divided into.
pub const MIN_SPLITS: usize = 2;
/// Most splits an equal division accepts.
pub const MAX_EQUAL_SPLITS: u32 = 10;

/// Compare two amounts within [`MONEY_EPSILON`].
pub fn money_eq(a: Decimal, b: Decimal) -> bool { (a - b).abs() <= MONEY_EPSILON }

/// Tender used to settle one split
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod { Cash, Card, Upi, Online }

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Cash => "CASH", Self::Card => "CARD", Self::Upi => "UPI", Self::Online => "ONLINE" }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Settlement record attached to a paid split
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub paid_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus { #[default] Pending, Paid }

impl PaymentStatus {
    pub fn is_paid(&self) -> bool { matches!(self, Self::Paid) }
}
