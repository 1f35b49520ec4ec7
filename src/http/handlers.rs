//! Split-bill handlers

use axum::{async_trait, extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Request, State}, http::request::Parts, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use crate::domain::value_objects::PaymentMethod;
use crate::proration::{SplitItemRequest, SplitRequest};
use crate::tenant::TenantContext;
use crate::{lifecycle, publisher, Result, SplitBillError};
use super::error::Envelope;
use super::AppState;

/// Header carrying the restaurant slug, set by the authentication layer.
pub const TENANT_HEADER: &str = "x-restaurant-slug";

/// Tenant the request is scoped to.
pub struct Tenant(pub TenantContext);

#[async_trait]
impl FromRequestParts<AppState> for Tenant {
    type Rejection = SplitBillError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let slug = parts.headers.get(TENANT_HEADER).and_then(|h| h.to_str().ok())
            .ok_or_else(|| SplitBillError::Validation(format!("missing {} header", TENANT_HEADER)))?;
        Ok(Tenant(state.tenants.resolve(slug).await?))
    }
}

/// JSON body that is deserialised and validated, rejecting with the
/// error envelope instead of axum's plain-text rejection.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: Validate + Send,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = SplitBillError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Json(value) = Json::<T>::from_request(req, state).await
            .map_err(|rejection| SplitBillError::Validation(rejection.body_text()))?;
        value.validate().map_err(|e| SplitBillError::Validation(e.to_string()))?;
        Ok(ValidJson(value))
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SplitByItemsBody {
    #[validate(length(min = 2, message = "At least 2 splits required"))]
    #[validate]
    pub splits: Vec<SplitBody>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SplitBody {
    #[validate(length(min = 1, message = "Each split must have items"))]
    #[validate]
    pub items: Vec<SplitItemBody>,
    #[validate(length(max = 100))]
    pub customer_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SplitItemBody {
    pub menu_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SplitEquallyBody {
    #[validate(range(min = 2, max = 10, message = "Number of splits must be between 2 and 10"))]
    pub number_of_splits: u32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBody {
    pub method: PaymentMethod,
    #[validate(length(min = 1, max = 128))]
    pub transaction_id: Option<String>,
}

impl SplitByItemsBody {
    fn into_requests(self) -> Vec<SplitRequest> {
        self.splits.into_iter().map(|split| SplitRequest {
            items: split.items.into_iter().map(|i| SplitItemRequest { menu_id: i.menu_id, quantity: i.quantity }).collect(),
            customer_name: split.customer_name,
        }).collect()
    }
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    raw.parse().map_err(|_| SplitBillError::Validation(format!("Invalid {} ID", what)))
}

pub async fn split_by_items(State(s): State<AppState>, Tenant(ctx): Tenant, Path(order_id): Path<String>, ValidJson(body): ValidJson<SplitByItemsBody>) -> Result<Json<Envelope>> {
    let order_id = parse_id(&order_id, "order")?;
    let created = lifecycle::split_by_items(&ctx, order_id, &body.into_requests()).await?;
    publisher::publish(s.nats.as_ref(), ctx.slug(), &created.events).await;
    Ok(Json(Envelope::split_bill(created.split_bill)))
}

pub async fn split_equally(State(s): State<AppState>, Tenant(ctx): Tenant, Path(order_id): Path<String>, ValidJson(body): ValidJson<SplitEquallyBody>) -> Result<Json<Envelope>> {
    let order_id = parse_id(&order_id, "order")?;
    let created = lifecycle::split_equally(&ctx, order_id, body.number_of_splits).await?;
    publisher::publish(s.nats.as_ref(), ctx.slug(), &created.events).await;
    Ok(Json(Envelope::split_bill(created.split_bill)))
}

pub async fn record_payment(State(s): State<AppState>, Tenant(ctx): Tenant, Path((split_bill_id, split_number)): Path<(String, String)>, ValidJson(body): ValidJson<PaymentBody>) -> Result<Json<Envelope>> {
    let split_bill_id = parse_id(&split_bill_id, "split bill")?;
    let split_number = split_number.parse::<u32>().ok().filter(|n| *n >= 1)
        .ok_or_else(|| SplitBillError::Validation("Invalid split number".into()))?;
    let paid = lifecycle::record_payment(&ctx, split_bill_id, split_number, body.method, body.transaction_id).await?;
    publisher::publish(s.nats.as_ref(), ctx.slug(), &paid.events).await;
    Ok(Json(Envelope::payment(paid.split_bill, paid.all_paid)))
}

pub async fn get_split_bill(Tenant(ctx): Tenant, Path(order_id): Path<String>) -> Result<Json<Envelope>> {
    let order_id = parse_id(&order_id, "order")?;
    Ok(Json(Envelope::split_bill(lifecycle::get_split_bill(&ctx, order_id).await?)))
}
