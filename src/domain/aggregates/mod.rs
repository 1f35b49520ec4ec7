//! Aggregates module
pub mod order;
pub mod split_bill;

pub use order::{ExtraItem, Order, OrderItem, OrderPatch, OrderPaymentDetails, OrderPaymentMethod, OrderStatus};
pub use split_bill::{Split, SplitBill, SplitBillStatus, SplitItem, SplitSummaryEntry};
