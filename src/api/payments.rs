//! Payment endpoints: listing plus the checkout success/cancel callbacks

use axum::{
    extract::{Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::payment::{Payment, PaymentType},
};

use super::AuthenticatedUser;

/// Payment list filters
#[derive(Deserialize, IntoParams)]
pub struct PaymentQuery {
    /// Filter by user (staff only)
    pub user_id: Option<i32>,
    /// "payment" or "fine"
    #[serde(rename = "type")]
    pub payment_type: Option<String>,
}

/// Success callback query
#[derive(Deserialize, IntoParams)]
pub struct SuccessQuery {
    pub session_id: Option<String>,
}

/// Confirmation returned once a session reconciles as paid
#[derive(Serialize, ToSchema)]
pub struct ConfirmationResponse {
    pub detail: String,
    pub payment_id: i32,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    #[schema(value_type = f64)]
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_email: Option<String>,
}

/// Informational body for the cancel callback
#[derive(Serialize, ToSchema)]
pub struct CancelResponse {
    pub detail: String,
}

/// List payments
#[utoipa::path(
    get,
    path = "/payments",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(PaymentQuery),
    responses(
        (status = 200, description = "Visible payments", body = Vec<Payment>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "user_id filter requires staff")
    )
)]
pub async fn list_payments(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PaymentQuery>,
) -> AppResult<Json<Vec<Payment>>> {
    let payments = state
        .services
        .payments
        .list(&claims, query.user_id, query.payment_type)
        .await?;
    Ok(Json(payments))
}

/// Checkout success callback: reconcile the session
#[utoipa::path(
    get,
    path = "/payments/success",
    tag = "payments",
    params(SuccessQuery),
    responses(
        (status = 200, description = "Payment confirmed", body = ConfirmationResponse),
        (status = 400, description = "Missing/unknown session or payment not completed"),
        (status = 502, description = "Payment processor unreachable")
    )
)]
pub async fn payment_success(
    State(state): State<crate::AppState>,
    Query(query): Query<SuccessQuery>,
) -> AppResult<Json<ConfirmationResponse>> {
    let session_id = query
        .session_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("session_id is required".to_string()))?;

    let confirmation = state.services.payments.reconcile_session(&session_id).await?;

    Ok(Json(ConfirmationResponse {
        detail: "Payment successful.".to_string(),
        payment_id: confirmation.payment_id,
        payment_type: confirmation.payment_type,
        amount: confirmation.amount,
        currency: confirmation.currency,
        payer_email: confirmation.payer_email,
    }))
}

/// Checkout cancel callback. The payment stays Pending and the stored
/// session link remains payable.
#[utoipa::path(
    get,
    path = "/payments/cancel",
    tag = "payments",
    responses(
        (status = 200, description = "Payment canceled", body = CancelResponse)
    )
)]
pub async fn payment_cancel() -> Json<CancelResponse> {
    Json(CancelResponse {
        detail: "Payment canceled. You can complete the checkout later using the same link."
            .to_string(),
    })
}
