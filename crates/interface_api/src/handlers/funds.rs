//! Fund and ledger handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{Currency, FundId, FundTransactionId};
use domain_fund::Fund;

use crate::dto::fund::*;
use crate::{error::ApiError, AppState};

/// Creates a fund with a zero balance
pub async fn create_fund(
    State(state): State<AppState>,
    Json(request): Json<CreateFundRequest>,
) -> Result<(StatusCode, Json<FundResponse>), ApiError> {
    request.validate()?;
    let currency: Currency = request.currency.parse()?;

    let mut fund = Fund::new(request.code, request.name, currency);
    if let Some(description) = request.description {
        fund = fund.with_description(description);
    }
    if request.allows_deficit {
        fund = fund.allowing_deficit();
    }

    let fund = state.ledger.create_fund(fund).await?;
    Ok((StatusCode::CREATED, Json(FundResponse::from(&fund))))
}

/// Lists funds
pub async fn list_funds(
    State(state): State<AppState>,
) -> Result<Json<Vec<FundResponse>>, ApiError> {
    let funds = state.ledger.list_funds().await?;
    Ok(Json(funds.iter().map(FundResponse::from).collect()))
}

/// Gets a fund
pub async fn get_fund(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FundResponse>, ApiError> {
    let fund = state.ledger.get_fund(FundId::from(id)).await?;
    Ok(Json(FundResponse::from(&fund)))
}

/// Closes a fund to new postings
pub async fn deactivate_fund(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FundResponse>, ApiError> {
    let fund = state.ledger.deactivate_fund(FundId::from(id)).await?;
    Ok(Json(FundResponse::from(&fund)))
}

/// Lists a fund's ledger in posting order
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<FundTransactionResponse>>, ApiError> {
    let entries = state.ledger.list_transactions(FundId::from(id)).await?;
    Ok(Json(entries.iter().map(FundTransactionResponse::from).collect()))
}

/// Posts a signed amount to a fund
pub async fn apply_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ApplyTransactionRequest>,
) -> Result<(StatusCode, Json<FundTransactionResponse>), ApiError> {
    request.validate()?;
    let link = request
        .link()
        .ok_or_else(|| ApiError::validation("exactly one of payment_id and loan_id is required"))?;

    let txn = state
        .ledger
        .apply_transaction(FundId::from(id), request.amount.to_money()?, link, request.description)
        .await?;
    Ok((StatusCode::CREATED, Json(FundTransactionResponse::from(&txn))))
}

/// Appends the reversal of a ledger entry
pub async fn reverse_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<FundTransactionResponse>), ApiError> {
    let reversal = state
        .ledger
        .reverse_transaction(FundTransactionId::from(id))
        .await?;
    Ok((StatusCode::CREATED, Json(FundTransactionResponse::from(&reversal))))
}
