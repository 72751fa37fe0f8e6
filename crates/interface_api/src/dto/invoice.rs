//! Invoice and payment DTOs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{FundId, InvoiceId, LineItemId, PaymentId, StudentId};
use domain_billing::{
    Cancellation, Invoice, InvoiceItem, InvoiceStatus, InvoiceSummary, InvoiceType, Payment, PaymentMethod,
    PaymentStatus,
};

use super::{MoneyDto, Page};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub invoice_type: InvoiceType,
    #[validate(length(equal = 3))]
    pub currency: String,
    pub student_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub counterparty: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub invoice_number: Option<String>,
    pub due_date: NaiveDate,
    #[validate(length(min = 1, max = 100), nested)]
    pub items: Vec<InvoiceItemRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct InvoiceItemRequest {
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(range(min = 1))]
    pub quantity: u32,
    pub unit_price: rust_decimal::Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    pub status: Option<InvoiceStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListInvoicesQuery {
    pub fn page(&self) -> Page {
        Page {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelInvoiceRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    pub amount: MoneyDto,
    pub method: PaymentMethod,
    pub student_id: Option<Uuid>,
    pub fund_id: Option<Uuid>,
    #[validate(length(min = 1, max = 100))]
    pub reference: Option<String>,
    /// Record without completing; confirmed later through `/payments/:id/confirm`
    #[serde(default)]
    pub pending: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VoidPaymentRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct InvoiceItemResponse {
    pub id: LineItemId,
    pub description: String,
    pub quantity: u32,
    pub unit_price: MoneyDto,
}

impl From<&InvoiceItem> for InvoiceItemResponse {
    fn from(item: &InvoiceItem) -> Self {
        Self {
            id: item.id,
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub invoice_type: InvoiceType,
    pub student_id: Option<StudentId>,
    pub counterparty: Option<String>,
    pub total: MoneyDto,
    pub status: InvoiceStatus,
    pub due_date: NaiveDate,
    pub items: Vec<InvoiceItemResponse>,
    pub cancellation: Option<Cancellation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Invoice> for InvoiceResponse {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id,
            invoice_number: invoice.invoice_number.clone(),
            invoice_type: invoice.invoice_type,
            student_id: invoice.student_id,
            counterparty: invoice.counterparty.clone(),
            total: invoice.total().into(),
            status: invoice.status(),
            due_date: invoice.due_date,
            items: invoice.items().iter().map(InvoiceItemResponse::from).collect(),
            cancellation: invoice.cancellation().cloned(),
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub student_id: Option<StudentId>,
    pub fund_id: Option<FundId>,
    pub amount: MoneyDto,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub voided_at: Option<DateTime<Utc>>,
    pub void_reason: Option<String>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id,
            invoice_id: payment.invoice_id,
            student_id: payment.student_id,
            fund_id: payment.fund_id,
            amount: payment.amount.into(),
            method: payment.method,
            status: payment.status,
            reference: payment.reference.clone(),
            paid_at: payment.paid_at,
            voided_at: payment.voided_at,
            void_reason: payment.void_reason.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceSummaryResponse {
    pub invoice: InvoiceResponse,
    pub payments: Vec<PaymentResponse>,
    pub paid: MoneyDto,
    pub balance_due: MoneyDto,
    pub computed_status: InvoiceStatus,
}

impl From<InvoiceSummary> for InvoiceSummaryResponse {
    fn from(summary: InvoiceSummary) -> Self {
        Self {
            invoice: InvoiceResponse::from(&summary.invoice),
            payments: summary.payments.iter().map(PaymentResponse::from).collect(),
            paid: summary.paid.into(),
            balance_due: summary.balance_due.into(),
            computed_status: summary.computed_status,
        }
    }
}
