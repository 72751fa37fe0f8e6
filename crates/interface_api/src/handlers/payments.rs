//! Payment handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::PaymentId;

use crate::dto::invoice::{PaymentResponse, VoidPaymentRequest};
use crate::{error::ApiError, AppState};

/// Confirms a pending payment
pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment = state.reconciler.confirm_payment(PaymentId::from(id)).await?;
    Ok(Json(PaymentResponse::from(&payment)))
}

/// Voids a payment; the row is kept with status `VOIDED`
pub async fn void_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<VoidPaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    request.validate()?;
    let payment = state
        .reconciler
        .delete_payment(PaymentId::from(id), request.reason)
        .await?;
    Ok(Json(PaymentResponse::from(&payment)))
}
