//! Billing domain errors

use thiserror::Error;

use core_kernel::{InvoiceId, Money, MoneyError, PaymentId};

use crate::invoice::InvoiceStatus;
use crate::payment::PaymentStatus;

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// Invoice not found
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    /// Payment not found
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// The operation is not allowed for the invoice's current status
    #[error("Cannot {operation} invoice {invoice_id}: status is {status}")]
    InvalidInvoiceState {
        invoice_id: InvoiceId,
        status: InvoiceStatus,
        operation: &'static str,
    },

    /// The operation is not allowed for the payment's current status
    #[error("Cannot {operation} payment {payment_id}: status is {status}")]
    InvalidPaymentState {
        payment_id: PaymentId,
        status: PaymentStatus,
        operation: &'static str,
    },

    /// Completing the payment would push the paid sum above the invoice total
    #[error("Payment of {attempted} on invoice {invoice_id} exceeds the balance: already paid {already_paid} of {total}")]
    Overpayment {
        invoice_id: InvoiceId,
        attempted: Money,
        already_paid: Money,
        total: Money,
    },

    /// Amount is zero, negative or in the wrong currency
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Invoice content is malformed (no items, zero total, bad item)
    #[error("Invalid invoice: {0}")]
    InvalidInvoice(String),

    /// Persisted data contradicts an invariant; needs manual review
    #[error("Integrity violation on invoice {invoice_id}: {violation}")]
    Integrity {
        invoice_id: InvoiceId,
        violation: IntegrityViolation,
    },

    /// Money arithmetic failed
    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl BillingError {
    /// True for errors that indicate corrupted data rather than a bad request
    pub fn is_integrity(&self) -> bool {
        matches!(self, BillingError::Integrity { .. })
    }
}

/// The invariant an invoice was found to break
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityViolation {
    #[error("completed payments {paid} exceed total {total}")]
    Overpaid { paid: Money, total: Money },

    #[error("stored total {stored} differs from line item sum {items}")]
    TotalMismatch { stored: Money, items: Money },

    #[error("stored status {stored} but payments imply {computed}")]
    StatusDrift {
        stored: InvoiceStatus,
        computed: InvoiceStatus,
    },
}
