//! Payment repository implementation
//!
//! Payments are never deleted. Voiding updates the status, `voided_at` and
//! `void_reason` columns and leaves the amount untouched.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use core_kernel::{FundId, InvoiceId, PaymentId, StudentId};
use domain_billing::{Payment, PaymentMethod, PaymentStatus};

use super::money;
use crate::error::DatabaseError;

const PAYMENT_COLUMNS: &str = r#"
    payment_id, invoice_id, student_id, fund_id, amount_minor, currency,
    method, status, reference, paid_at, voided_at, void_reason, created_at
"#;

/// Repository for payments
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentRepository;

impl PaymentRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert(&self, conn: &mut PgConnection, payment: &Payment) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id, invoice_id, student_id, fund_id, amount_minor, currency,
                method, status, reference, paid_at, voided_at, void_reason, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(Uuid::from(payment.id))
        .bind(Uuid::from(payment.invoice_id))
        .bind(payment.student_id.map(Uuid::from))
        .bind(payment.fund_id.map(Uuid::from))
        .bind(payment.amount.minor())
        .bind(payment.amount.currency().code())
        .bind(PgPaymentMethod::from(payment.method))
        .bind(PgPaymentStatus::from(payment.status))
        .bind(&payment.reference)
        .bind(payment.paid_at)
        .bind(payment.voided_at)
        .bind(&payment.void_reason)
        .bind(payment.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn find(
        &self,
        conn: &mut PgConnection,
        id: PaymentId,
    ) -> Result<Option<Payment>, DatabaseError> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_id = $1");
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *conn)
            .await?;

        row.map(PaymentRow::into_payment).transpose()
    }

    /// Returns every payment on an invoice, in recording order
    ///
    /// Includes pending and voided payments; the reconciliation rules decide
    /// which ones count.
    pub async fn for_invoice(
        &self,
        conn: &mut PgConnection,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Payment>, DatabaseError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = $1 ORDER BY created_at, payment_id"
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(Uuid::from(invoice_id))
            .fetch_all(&mut *conn)
            .await?;

        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    /// Persists a status change (completion or void)
    pub async fn update_status(&self, conn: &mut PgConnection, payment: &Payment) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, paid_at = $3, voided_at = $4, void_reason = $5
            WHERE payment_id = $1
            "#,
        )
        .bind(Uuid::from(payment.id))
        .bind(PgPaymentStatus::from(payment.status))
        .bind(payment.paid_at)
        .bind(payment.voided_at)
        .bind(&payment.void_reason)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Payment", payment.id));
        }
        Ok(())
    }
}

/// Payment method column
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PgPaymentMethod {
    Cash,
    BankTransfer,
    Card,
}

impl From<PaymentMethod> for PgPaymentMethod {
    fn from(value: PaymentMethod) -> Self {
        match value {
            PaymentMethod::Cash => PgPaymentMethod::Cash,
            PaymentMethod::BankTransfer => PgPaymentMethod::BankTransfer,
            PaymentMethod::Card => PgPaymentMethod::Card,
        }
    }
}

impl From<PgPaymentMethod> for PaymentMethod {
    fn from(value: PgPaymentMethod) -> Self {
        match value {
            PgPaymentMethod::Cash => PaymentMethod::Cash,
            PgPaymentMethod::BankTransfer => PaymentMethod::BankTransfer,
            PgPaymentMethod::Card => PaymentMethod::Card,
        }
    }
}

/// Payment status column
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PgPaymentStatus {
    Pending,
    Completed,
    Voided,
}

impl From<PaymentStatus> for PgPaymentStatus {
    fn from(value: PaymentStatus) -> Self {
        match value {
            PaymentStatus::Pending => PgPaymentStatus::Pending,
            PaymentStatus::Completed => PgPaymentStatus::Completed,
            PaymentStatus::Voided => PgPaymentStatus::Voided,
        }
    }
}

impl From<PgPaymentStatus> for PaymentStatus {
    fn from(value: PgPaymentStatus) -> Self {
        match value {
            PgPaymentStatus::Pending => PaymentStatus::Pending,
            PgPaymentStatus::Completed => PaymentStatus::Completed,
            PgPaymentStatus::Voided => PaymentStatus::Voided,
        }
    }
}

/// Database row for a payment
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub invoice_id: Uuid,
    pub student_id: Option<Uuid>,
    pub fund_id: Option<Uuid>,
    pub amount_minor: i64,
    pub currency: String,
    pub method: PgPaymentMethod,
    pub status: PgPaymentStatus,
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub voided_at: Option<DateTime<Utc>>,
    pub void_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment, DatabaseError> {
        Ok(Payment {
            id: PaymentId::from_uuid(self.payment_id),
            invoice_id: InvoiceId::from_uuid(self.invoice_id),
            student_id: self.student_id.map(StudentId::from_uuid),
            fund_id: self.fund_id.map(FundId::from_uuid),
            amount: money(self.amount_minor, &self.currency)?,
            method: self.method.into(),
            status: self.status.into(),
            reference: self.reference,
            paid_at: self.paid_at,
            voided_at: self.voided_at,
            void_reason: self.void_reason,
            created_at: self.created_at,
        })
    }
}
