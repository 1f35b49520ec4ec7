//! Error to response mapping and the response envelope

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use tracing::error;
use crate::domain::aggregates::SplitBill;
use crate::SplitBillError;

/// Body of every split-bill response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_bill: Option<SplitBill>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_paid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn split_bill(split_bill: SplitBill) -> Self {
        Self { success: true, split_bill: Some(split_bill), all_paid: None, error: None }
    }

    pub fn payment(split_bill: SplitBill, all_paid: bool) -> Self {
        Self { success: true, split_bill: Some(split_bill), all_paid: Some(all_paid), error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { success: false, split_bill: None, all_paid: None, error: Some(message.into()) }
    }
}

impl SplitBillError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::ItemNotFound(_) => StatusCode::BAD_REQUEST,
            Self::OrderNotFound(_) | Self::SplitBillNotFound(_) | Self::SplitNotFound { .. } => StatusCode::NOT_FOUND,
            Self::AlreadySplit(_) | Self::OrderAlreadyCompleted(_) | Self::AlreadyPaid { .. } => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SplitBillError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Storage(msg) => {
                error!(target: "storage", error = %msg, "Storage error occurred");
                "Internal storage error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(Envelope::error(message))).into_response()
    }
}
