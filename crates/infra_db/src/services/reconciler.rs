//! Invoice-payment reconciler
//!
//! Keeps each invoice's stored status equal to what its completed payments
//! say it should be. Every write that can change the paid sum locks the
//! invoice row first, recomputes the status with
//! [`Invoice::reconcile`](domain_billing::Invoice::reconcile), and commits
//! the payment, the status and any fund effect together.

use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};

use core_kernel::{FundId, InvoiceId, Money, PaymentId, StudentId};
use domain_billing::reconciliation::{self, fund_effect};
use domain_billing::{BillingError, Invoice, InvoiceStatus, InvoiceSummary, Payment, PaymentMethod, PaymentStatus};
use domain_fund::TransactionLink;

use super::alert;
use super::fund_ledger::FundLedger;
use crate::error::{DatabaseError, ServiceError};
use crate::repositories::{FundRepository, InvoiceRepository, PaymentRepository};

/// Request to record a payment against an invoice
#[derive(Debug, Clone)]
pub struct RecordPayment {
    pub invoice_id: InvoiceId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub student_id: Option<StudentId>,
    pub fund_id: Option<FundId>,
    pub reference: Option<String>,
}

impl RecordPayment {
    pub fn new(invoice_id: InvoiceId, amount: Money, method: PaymentMethod) -> Self {
        Self {
            invoice_id,
            amount,
            method,
            student_id: None,
            fund_id: None,
            reference: None,
        }
    }

    pub fn with_student(mut self, student_id: StudentId) -> Self {
        self.student_id = Some(student_id);
        self
    }

    pub fn with_fund(mut self, fund_id: FundId) -> Self {
        self.fund_id = Some(fund_id);
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    fn into_payment(self) -> Payment {
        let payment = Payment::new(self.invoice_id, self.amount, self.method)
            .with_student(self.student_id)
            .with_fund(self.fund_id);
        match self.reference {
            Some(reference) => payment.with_reference(reference),
            None => payment,
        }
    }
}

/// Service for invoices, payments and status reconciliation
#[derive(Debug, Clone)]
pub struct Reconciler {
    pool: PgPool,
    invoices: InvoiceRepository,
    payments: PaymentRepository,
    funds: FundRepository,
    ledger: FundLedger,
}

impl Reconciler {
    /// Creates a new Reconciler with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            ledger: FundLedger::new(pool.clone()),
            pool,
            invoices: InvoiceRepository::new(),
            payments: PaymentRepository::new(),
            funds: FundRepository::new(),
        }
    }

    /// Stores a new invoice
    ///
    /// # Errors
    ///
    /// `InvalidInvoice` without items or with a non-positive total.
    pub async fn create_invoice(&self, invoice: Invoice) -> Result<Invoice, ServiceError> {
        invoice.validate()?;
        if invoice.status() != InvoiceStatus::Pending {
            return Err(BillingError::InvalidInvoice("a new invoice must be pending".to_string()).into());
        }

        let mut tx = self.pool.begin().await?;
        self.invoices.insert(&mut tx, &invoice).await?;
        tx.commit().await?;

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total(),
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Lists invoices, newest first
    pub async fn list_invoices(
        &self,
        status: Option<InvoiceStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Invoice>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(self.invoices.list(&mut conn, status, limit, offset).await?)
    }

    /// Returns every payment on an invoice, voided ones included
    pub async fn list_payments(&self, invoice_id: InvoiceId) -> Result<Vec<Payment>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        if self.invoices.find(&mut conn, invoice_id).await?.is_none() {
            return Err(BillingError::InvoiceNotFound(invoice_id).into());
        }
        Ok(self.payments.for_invoice(&mut conn, invoice_id).await?)
    }

    /// Returns the invoice with its payments and a freshly computed status
    pub async fn invoice_summary(&self, invoice_id: InvoiceId) -> Result<InvoiceSummary, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let invoice = self
            .invoices
            .find(&mut conn, invoice_id)
            .await?
            .ok_or(BillingError::InvoiceNotFound(invoice_id))?;
        let payments = self.payments.for_invoice(&mut conn, invoice_id).await?;

        InvoiceSummary::build(invoice, payments).map_err(alert)
    }

    /// Records a completed payment
    ///
    /// Inserts the payment, persists the recomputed invoice status and, when
    /// a fund is named, posts the payment's effect to that fund, all in one
    /// transaction.
    ///
    /// # Errors
    ///
    /// - `InvoiceNotFound`
    /// - `InvalidInvoiceState` if the invoice is cancelled
    /// - `InvalidAmount` for a non-positive amount or another currency
    /// - `Overpayment` if the paid sum would exceed the total
    /// - fund errors from posting the effect (`FundNotFound`,
    ///   `FundInactive`, `InsufficientFunds`)
    pub async fn record_payment(&self, request: RecordPayment) -> Result<Payment, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let (mut invoice, mut payments) = self.lock_invoice(&mut tx, request.invoice_id).await?;

        let check = reconciliation::check_payment(&invoice, &payments, request.amount).map_err(alert)?;
        let mut payment = request.into_payment();
        payment.complete()?;
        self.payments.insert(&mut tx, &payment).await?;

        payments.push(payment.clone());
        let status = self.persist_status(&mut tx, &mut invoice, &payments).await?;
        debug_assert_eq!(status, check.status_after);

        if let Some(fund_id) = payment.fund_id {
            self.post_effect(&mut tx, &invoice, &payment, fund_id).await?;
        }
        tx.commit().await?;

        info!(
            invoice_id = %invoice.id,
            payment_id = %payment.id,
            amount = %payment.amount,
            paid = %check.paid_after,
            status = %status,
            "Payment recorded"
        );
        Ok(payment)
    }

    /// Records a payment that does not count until confirmed
    ///
    /// The amount is checked against the current paid sum so that an
    /// obviously excessive payment is rejected early; the check is repeated
    /// on confirmation.
    pub async fn record_pending_payment(&self, request: RecordPayment) -> Result<Payment, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let (invoice, payments) = self.lock_invoice(&mut tx, request.invoice_id).await?;

        reconciliation::check_payment(&invoice, &payments, request.amount).map_err(alert)?;
        let payment = request.into_payment();
        self.payments.insert(&mut tx, &payment).await?;
        tx.commit().await?;

        info!(
            invoice_id = %invoice.id,
            payment_id = %payment.id,
            amount = %payment.amount,
            "Pending payment recorded"
        );
        Ok(payment)
    }

    /// Completes a pending payment
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound`
    /// - `InvalidPaymentState` unless the payment is pending
    /// - every error of [`Reconciler::record_payment`]
    pub async fn confirm_payment(&self, payment_id: PaymentId) -> Result<Payment, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let (mut invoice, mut payments, index) = self.lock_payment(&mut tx, payment_id).await?;

        if payments[index].status != PaymentStatus::Pending {
            return Err(BillingError::InvalidPaymentState {
                payment_id,
                status: payments[index].status,
                operation: "confirm",
            }
            .into());
        }
        let amount = payments[index].amount;
        let check = reconciliation::check_payment(&invoice, &payments, amount).map_err(alert)?;
        payments[index].complete()?;
        self.payments.update_status(&mut tx, &payments[index]).await?;

        let status = self.persist_status(&mut tx, &mut invoice, &payments).await?;
        debug_assert_eq!(status, check.status_after);

        let payment = payments.swap_remove(index);
        if let Some(fund_id) = payment.fund_id {
            self.post_effect(&mut tx, &invoice, &payment, fund_id).await?;
        }
        tx.commit().await?;

        info!(
            invoice_id = %invoice.id,
            payment_id = %payment.id,
            amount = %payment.amount,
            status = %status,
            "Payment confirmed"
        );
        Ok(payment)
    }

    /// Voids a payment and re-evaluates its invoice
    ///
    /// The row is kept with status `VOIDED`. If the payment was completed and
    /// posted to a fund, the fund entry is reversed. A cancelled invoice keeps
    /// its status.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound`
    /// - `InvalidPaymentState` if the payment is already voided
    /// - `InsufficientFunds` if reversing the fund entry would overdraw it
    pub async fn delete_payment(
        &self,
        payment_id: PaymentId,
        reason: impl Into<String>,
    ) -> Result<Payment, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let (mut invoice, mut payments, index) = self.lock_payment(&mut tx, payment_id).await?;

        let was_completed = payments[index].is_completed();
        payments[index].void(reason)?;
        self.payments.update_status(&mut tx, &payments[index]).await?;

        let status = self.persist_status(&mut tx, &mut invoice, &payments).await?;

        let payment = payments.swap_remove(index);
        if was_completed && payment.fund_id.is_some() {
            let original = self
                .funds
                .transaction_for_payment(&mut tx, payment.id)
                .await?
                .ok_or_else(|| {
                    DatabaseError::CorruptRow(format!(
                        "payment {} names a fund but has no ledger entry",
                        payment.id
                    ))
                })?;
            self.ledger.reverse_entry(&mut tx, &original).await?;
        }
        tx.commit().await?;

        warn!(
            invoice_id = %invoice.id,
            payment_id = %payment.id,
            amount = %payment.amount,
            reason = payment.void_reason.as_deref().unwrap_or_default(),
            status = %status,
            "Payment voided"
        );
        Ok(payment)
    }

    /// Cancels an invoice that is still pending or partially paid
    ///
    /// Payments are left as they are.
    pub async fn cancel_invoice(
        &self,
        invoice_id: InvoiceId,
        reason: impl Into<String>,
        actor: impl Into<String>,
    ) -> Result<Invoice, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let (mut invoice, _) = self.lock_invoice(&mut tx, invoice_id).await?;

        invoice.cancel(reason, actor)?;
        self.invoices.update_status(&mut tx, &invoice).await?;
        tx.commit().await?;

        info!(
            invoice_id = %invoice.id,
            actor = invoice.cancellation().map(|c| c.actor.as_str()).unwrap_or_default(),
            "Invoice cancelled"
        );
        Ok(invoice)
    }

    async fn lock_invoice(
        &self,
        conn: &mut PgConnection,
        invoice_id: InvoiceId,
    ) -> Result<(Invoice, Vec<Payment>), ServiceError> {
        let invoice = self
            .invoices
            .find_for_update(conn, invoice_id)
            .await?
            .ok_or(BillingError::InvoiceNotFound(invoice_id))?;
        let payments = self.payments.for_invoice(conn, invoice_id).await?;
        Ok((invoice, payments))
    }

    /// Locks a payment's invoice and returns the payment's index in its list
    ///
    /// The payment is re-read after the invoice lock is held, so its status
    /// cannot change underneath the caller.
    async fn lock_payment(
        &self,
        conn: &mut PgConnection,
        payment_id: PaymentId,
    ) -> Result<(Invoice, Vec<Payment>, usize), ServiceError> {
        let invoice_id = self
            .payments
            .find(conn, payment_id)
            .await?
            .ok_or(BillingError::PaymentNotFound(payment_id))?
            .invoice_id;

        let (invoice, payments) = self.lock_invoice(conn, invoice_id).await?;
        let index = payments
            .iter()
            .position(|p| p.id == payment_id)
            .ok_or(BillingError::PaymentNotFound(payment_id))?;
        Ok((invoice, payments, index))
    }

    async fn persist_status(
        &self,
        conn: &mut PgConnection,
        invoice: &mut Invoice,
        payments: &[Payment],
    ) -> Result<InvoiceStatus, ServiceError> {
        let before = invoice.status();
        let status = invoice.reconcile(payments).map_err(alert)?;
        if status != before {
            self.invoices.update_status(conn, invoice).await?;
        }
        Ok(status)
    }

    async fn post_effect(
        &self,
        conn: &mut PgConnection,
        invoice: &Invoice,
        payment: &Payment,
        fund_id: FundId,
    ) -> Result<(), ServiceError> {
        let amount = fund_effect(invoice.invoice_type, payment.amount)?;
        self.ledger
            .post(
                conn,
                fund_id,
                amount,
                TransactionLink::Payment(payment.id),
                Some(format!("Payment {} on {}", payment.id, invoice.invoice_number)),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;

    #[test]
    fn test_record_payment_request_builds_pending_payment() {
        let invoice_id = InvoiceId::new();
        let fund_id = FundId::new();
        let payment = RecordPayment::new(invoice_id, Money::from_minor(5_000, Currency::XOF), PaymentMethod::Cash)
            .with_fund(fund_id)
            .with_reference("RCPT-42")
            .into_payment();

        assert_eq!(payment.invoice_id, invoice_id);
        assert_eq!(payment.fund_id, Some(fund_id));
        assert_eq!(payment.reference.as_deref(), Some("RCPT-42"));
        assert!(!payment.is_completed());
    }
}
