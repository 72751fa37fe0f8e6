//! Integrity audit handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{FundId, InvoiceId};
use domain_billing::InvoiceStatus;
use infra_db::IntegrityReport;

use crate::dto::MoneyDto;
use crate::{error::ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct SweepQuery {
    #[serde(default)]
    pub repair: bool,
}

#[derive(Debug, Serialize)]
pub struct InvoiceCheckResponse {
    pub invoice_id: InvoiceId,
    pub status: InvoiceStatus,
}

#[derive(Debug, Serialize)]
pub struct FundCheckResponse {
    pub fund_id: FundId,
    pub balance: MoneyDto,
}

/// Checks every invoice and fund; with `repair=true` rewrites drifted statuses
pub async fn integrity_sweep(
    State(state): State<AppState>,
    Query(query): Query<SweepQuery>,
) -> Result<Json<IntegrityReport>, ApiError> {
    let report = state.auditor.sweep(query.repair).await?;
    Ok(Json(report))
}

pub async fn verify_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceCheckResponse>, ApiError> {
    let invoice_id = InvoiceId::from(id);
    let status = state.auditor.verify_invoice(invoice_id).await?;
    Ok(Json(InvoiceCheckResponse { invoice_id, status }))
}

pub async fn verify_fund(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FundCheckResponse>, ApiError> {
    let fund_id = FundId::from(id);
    let balance = state.auditor.verify_fund(fund_id).await?;
    Ok(Json(FundCheckResponse { fund_id, balance: balance.into() }))
}
