//! Invoice handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{Currency, InvoiceId, Money, StudentId};
use domain_billing::{Invoice, InvoiceItem};
use infra_db::RecordPayment;

use crate::auth::Claims;
use crate::dto::invoice::*;
use crate::{error::ApiError, AppState};

/// Builds an invoice from the request; items are priced in the invoice currency
fn build_invoice(request: CreateInvoiceRequest) -> Result<Invoice, ApiError> {
    let currency: Currency = request.currency.parse()?;

    let mut invoice = Invoice::new(request.invoice_type, currency, request.due_date);
    if let Some(student_id) = request.student_id {
        invoice = invoice.for_student(StudentId::from(student_id));
    }
    if let Some(counterparty) = request.counterparty {
        invoice = invoice.with_counterparty(counterparty);
    }
    if let Some(number) = request.invoice_number {
        invoice = invoice.with_number(number);
    }

    for item in request.items {
        let unit_price = Money::from_major(item.unit_price, currency)?;
        invoice.add_item(InvoiceItem::new(item.description, unit_price).with_quantity(item.quantity))?;
    }
    Ok(invoice)
}

/// Creates an invoice with its line items
pub async fn create_invoice(
    State(state): State<AppState>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), ApiError> {
    request.validate()?;
    let invoice = state.reconciler.create_invoice(build_invoice(request)?).await?;
    Ok((StatusCode::CREATED, Json(InvoiceResponse::from(&invoice))))
}

/// Lists invoices, newest first
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<Vec<InvoiceResponse>>, ApiError> {
    let page = query.page();
    let invoices = state
        .reconciler
        .list_invoices(query.status, page.limit(), page.offset())
        .await?;
    Ok(Json(invoices.iter().map(InvoiceResponse::from).collect()))
}

/// Gets an invoice with its payments and paid amount
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceSummaryResponse>, ApiError> {
    let summary = state.reconciler.invoice_summary(InvoiceId::from(id)).await?;
    Ok(Json(summary.into()))
}

/// Cancels an invoice; the token subject is recorded as the actor
pub async fn cancel_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CancelInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    request.validate()?;
    let invoice = state
        .reconciler
        .cancel_invoice(InvoiceId::from(id), request.reason, claims.sub)
        .await?;
    Ok(Json(InvoiceResponse::from(&invoice)))
}

/// Records a payment against an invoice
pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    request.validate()?;

    let mut payment = RecordPayment::new(InvoiceId::from(id), request.amount.to_money()?, request.method);
    if let Some(student_id) = request.student_id {
        payment = payment.with_student(student_id.into());
    }
    if let Some(fund_id) = request.fund_id {
        payment = payment.with_fund(fund_id.into());
    }
    if let Some(reference) = request.reference {
        payment = payment.with_reference(reference);
    }

    let payment = if request.pending {
        state.reconciler.record_pending_payment(payment).await?
    } else {
        state.reconciler.record_payment(payment).await?
    };
    Ok((StatusCode::CREATED, Json(PaymentResponse::from(&payment))))
}

/// Lists every payment on an invoice, voided ones included
pub async fn list_payments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let payments = state.reconciler.list_payments(InvoiceId::from(id)).await?;
    Ok(Json(payments.iter().map(PaymentResponse::from).collect()))
}
