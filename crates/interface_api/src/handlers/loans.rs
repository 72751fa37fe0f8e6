//! Inter-fund loan handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use core_kernel::FundLoanId;
use infra_db::NewLoan;

use crate::dto::fund::{CreateLoanRequest, LoanResponse, OverdueQuery};
use crate::{error::ApiError, AppState};

/// Creates a pending loan
pub async fn create_loan(
    State(state): State<AppState>,
    Json(request): Json<CreateLoanRequest>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    request.validate()?;
    let loan = state
        .ledger
        .create_loan(NewLoan {
            lender_fund_id: request.lender_fund_id.into(),
            borrower_fund_id: request.borrower_fund_id.into(),
            principal: request.principal.to_money()?,
            due_date: request.due_date,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(LoanResponse::from(&loan))))
}

pub async fn list_loans(
    State(state): State<AppState>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let loans = state.ledger.list_loans().await?;
    Ok(Json(loans.iter().map(LoanResponse::from).collect()))
}

pub async fn get_loan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan = state.ledger.get_loan(FundLoanId::from(id)).await?;
    Ok(Json(LoanResponse::from(&loan)))
}

/// Approves a loan and disburses the principal
pub async fn approve_loan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan = state.ledger.approve_loan(FundLoanId::from(id)).await?;
    Ok(Json(LoanResponse::from(&loan)))
}

/// Repays a loan and returns the principal to the lender
pub async fn repay_loan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan = state.ledger.repay_loan(FundLoanId::from(id)).await?;
    Ok(Json(LoanResponse::from(&loan)))
}

/// Flags approved loans past their due date; returns the loans that changed
pub async fn mark_overdue(
    State(state): State<AppState>,
    Query(query): Query<OverdueQuery>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let today = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let loans = state.ledger.mark_overdue_loans(today).await?;
    Ok(Json(loans.iter().map(LoanResponse::from).collect()))
}
