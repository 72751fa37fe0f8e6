//! Payment recording
//!
//! A payment applies to exactly one invoice. Only `Completed` payments count
//! toward the invoice's paid amount; voided payments are kept as an audit
//! trail instead of being deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{FundId, InvoiceId, Money, PaymentId, StudentId};

use crate::error::BillingError;

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
}

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Recorded but not yet confirmed; does not count toward the invoice
    Pending,
    /// Confirmed; counts toward the invoice
    Completed,
    /// Soft-deleted
    Voided,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Voided => "VOIDED",
        })
    }
}

/// A payment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Invoice being paid
    pub invoice_id: InvoiceId,
    /// Paying student, absent for supplier invoices
    pub student_id: Option<StudentId>,
    /// Fund credited or debited by this payment
    pub fund_id: Option<FundId>,
    /// Payment amount, always positive
    pub amount: Money,
    /// Payment method
    pub method: PaymentMethod,
    /// Status
    pub status: PaymentStatus,
    /// External reference (bank ref, receipt number)
    pub reference: Option<String>,
    /// When the money moved
    pub paid_at: DateTime<Utc>,
    /// When the payment was voided
    pub voided_at: Option<DateTime<Utc>>,
    /// Why the payment was voided
    pub void_reason: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new pending payment
    ///
    /// # Arguments
    ///
    /// * `invoice_id` - Invoice being paid
    /// * `amount` - Payment amount
    /// * `method` - Payment method
    pub fn new(invoice_id: InvoiceId, amount: Money, method: PaymentMethod) -> Self {
        let now = Utc::now();

        Self {
            id: PaymentId::new_v7(),
            invoice_id,
            student_id: None,
            fund_id: None,
            amount,
            method,
            status: PaymentStatus::Pending,
            reference: None,
            paid_at: now,
            voided_at: None,
            void_reason: None,
            created_at: now,
        }
    }

    pub fn with_student(mut self, student_id: Option<StudentId>) -> Self {
        self.student_id = student_id;
        self
    }

    pub fn with_fund(mut self, fund_id: Option<FundId>) -> Self {
        self.fund_id = fund_id;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Returns true if the payment counts toward its invoice
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }

    /// Marks a pending payment as completed
    ///
    /// Overpayment is checked by the caller against the invoice, see
    /// [`crate::reconciliation::check_payment`].
    pub fn complete(&mut self) -> Result<(), BillingError> {
        if self.status != PaymentStatus::Pending {
            return Err(BillingError::InvalidPaymentState {
                payment_id: self.id,
                status: self.status,
                operation: "complete",
            });
        }
        self.status = PaymentStatus::Completed;
        self.paid_at = Utc::now();
        Ok(())
    }

    /// Voids the payment, keeping the row for audit
    pub fn void(&mut self, reason: impl Into<String>) -> Result<(), BillingError> {
        if self.status == PaymentStatus::Voided {
            return Err(BillingError::InvalidPaymentState {
                payment_id: self.id,
                status: self.status,
                operation: "void",
            });
        }
        self.status = PaymentStatus::Voided;
        self.voided_at = Some(Utc::now());
        self.void_reason = Some(reason.into());
        Ok(())
    }
}
