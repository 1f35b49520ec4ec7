//! Split-Bill Engine
//!
//! Multi-tenant restaurant point-of-sale back office: divides one order into
//! several sub-bills and settles them until the parent order is paid.
//!
//! ## Features
//! - Split by items with tax proration
//! - Equal split
//! - Per-split payment tracking with order reconciliation
//! - Database-per-tenant routing
//! - Backfill job for the denormalized order summary

pub mod backfill;
pub mod config;
pub mod domain;
pub mod http;
pub mod lifecycle;
pub mod proration;
pub mod publisher;
pub mod store;
pub mod tenant;

use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum SplitBillError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Order {0} not found")]
    OrderNotFound(Uuid),

    #[error("Split bill {0} not found")]
    SplitBillNotFound(String),

    #[error("Split {split_number} not found in split bill {split_bill_id}")]
    SplitNotFound { split_bill_id: Uuid, split_number: u32 },

    #[error("Item {0} not found in order")]
    ItemNotFound(Uuid),

    #[error("Order {0} already has a split bill")]
    AlreadySplit(Uuid),

    #[error("Order {0} already completed")]
    OrderAlreadyCompleted(Uuid),

    #[error("Split {split_number} of split bill {split_bill_id} is already paid")]
    AlreadyPaid { split_bill_id: Uuid, split_number: u32 },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for SplitBillError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for SplitBillError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SplitBillError>;
