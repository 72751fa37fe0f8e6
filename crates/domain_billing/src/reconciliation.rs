//! Invoice status reconciliation
//!
//! Pure functions that derive an invoice's status from its payments. Storage
//! layers load the invoice and its payments under a row lock, call these
//! functions, and persist whatever they return in the same transaction.

use serde::Serialize;
use std::cmp::Ordering;

use core_kernel::{InvoiceId, Money};

use crate::error::{BillingError, IntegrityViolation};
use crate::invoice::{Invoice, InvoiceStatus, InvoiceType};
use crate::payment::Payment;

/// Sums the completed payments that belong to `invoice`
///
/// Payments for other invoices and payments that are pending or voided are
/// ignored.
pub fn paid_amount(invoice: &Invoice, payments: &[Payment]) -> Result<Money, BillingError> {
    let completed: Vec<Money> = payments
        .iter()
        .filter(|p| p.invoice_id == invoice.id && p.is_completed())
        .map(|p| p.amount)
        .collect();

    Ok(Money::checked_sum(&completed, invoice.currency)?)
}

/// Maps a paid sum onto a status for a non-cancelled invoice
///
/// # Errors
///
/// `Integrity` when `paid` exceeds `total`. The caller must not clamp.
pub fn status_for_paid(
    invoice_id: InvoiceId,
    paid: Money,
    total: Money,
) -> Result<InvoiceStatus, BillingError> {
    paid.ensure_same_currency(&total)?;

    if paid.is_zero() {
        return Ok(InvoiceStatus::Pending);
    }
    if paid.is_negative() {
        return Err(BillingError::InvalidAmount(format!(
            "paid sum on invoice {} is negative: {}",
            invoice_id, paid
        )));
    }

    match paid.minor().cmp(&total.minor()) {
        Ordering::Less => Ok(InvoiceStatus::Partial),
        Ordering::Equal => Ok(InvoiceStatus::Paid),
        Ordering::Greater => Err(BillingError::Integrity {
            invoice_id,
            violation: IntegrityViolation::Overpaid { paid, total },
        }),
    }
}

/// Computes the status an invoice should have given its payments
///
/// `Cancelled` is terminal and returned as-is without looking at payments.
pub fn compute_status(invoice: &Invoice, payments: &[Payment]) -> Result<InvoiceStatus, BillingError> {
    if invoice.is_cancelled() {
        return Ok(InvoiceStatus::Cancelled);
    }
    let paid = paid_amount(invoice, payments)?;
    status_for_paid(invoice.id, paid, invoice.total())
}

/// Outcome of validating a payment before it is completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentCheck {
    pub paid_before: Money,
    pub paid_after: Money,
    pub status_after: InvoiceStatus,
}

/// Validates that `amount` may be completed against `invoice`
///
/// # Errors
///
/// - `InvalidInvoiceState` if the invoice is cancelled
/// - `InvalidAmount` if the amount is not positive or in another currency
/// - `Integrity` if the existing payments already exceed the total
/// - `Overpayment` if the amount would push the paid sum above the total
pub fn check_payment(
    invoice: &Invoice,
    payments: &[Payment],
    amount: Money,
) -> Result<PaymentCheck, BillingError> {
    if invoice.is_cancelled() {
        return Err(BillingError::InvalidInvoiceState {
            invoice_id: invoice.id,
            status: invoice.status(),
            operation: "record a payment on",
        });
    }
    if !amount.is_positive() {
        return Err(BillingError::InvalidAmount(format!(
            "payment amount must be positive, got {}",
            amount
        )));
    }
    if amount.currency() != invoice.currency {
        return Err(BillingError::InvalidAmount(format!(
            "payment currency {} does not match invoice currency {}",
            amount.currency(),
            invoice.currency
        )));
    }

    let paid_before = paid_amount(invoice, payments)?;
    status_for_paid(invoice.id, paid_before, invoice.total())?;

    let paid_after = paid_before.checked_add(&amount)?;
    if paid_after.minor() > invoice.total().minor() {
        return Err(BillingError::Overpayment {
            invoice_id: invoice.id,
            attempted: amount,
            already_paid: paid_before,
            total: invoice.total(),
        });
    }

    Ok(PaymentCheck {
        paid_before,
        paid_after,
        status_after: status_for_paid(invoice.id, paid_after, invoice.total())?,
    })
}

/// Signed effect of a payment on the fund it names
///
/// Student payments bring money in; supplier payments take it out.
pub fn fund_effect(invoice_type: InvoiceType, amount: Money) -> Result<Money, BillingError> {
    match invoice_type {
        InvoiceType::Outgoing => Ok(amount),
        InvoiceType::Incoming => Ok(amount.checked_neg()?),
    }
}

/// Checks every invariant of a stored invoice against its stored payments
///
/// Returns the computed status when the stored one matches.
///
/// # Errors
///
/// `Integrity` with `TotalMismatch`, `Overpaid` or `StatusDrift`.
pub fn verify(invoice: &Invoice, payments: &[Payment]) -> Result<InvoiceStatus, BillingError> {
    invoice.verify_total()?;

    let computed = compute_status(invoice, payments)?;
    if computed != invoice.status() {
        return Err(BillingError::Integrity {
            invoice_id: invoice.id,
            violation: IntegrityViolation::StatusDrift {
                stored: invoice.status(),
                computed,
            },
        });
    }
    Ok(computed)
}

/// Read model of an invoice with its payment position
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceSummary {
    pub invoice: Invoice,
    pub payments: Vec<Payment>,
    pub paid: Money,
    pub balance_due: Money,
    pub computed_status: InvoiceStatus,
}

impl InvoiceSummary {
    pub fn build(invoice: Invoice, payments: Vec<Payment>) -> Result<Self, BillingError> {
        let paid = paid_amount(&invoice, &payments)?;
        let computed_status = compute_status(&invoice, &payments)?;
        let balance_due = if invoice.is_cancelled() {
            Money::zero(invoice.currency)
        } else {
            invoice.total().checked_sub(&paid)?
        };

        Ok(Self {
            invoice,
            payments,
            paid,
            balance_due,
            computed_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::Currency;

    use crate::invoice::InvoiceItem;
    use crate::payment::PaymentMethod;

    fn xof(minor: i64) -> Money {
        Money::from_minor(minor, Currency::XOF)
    }

    fn invoice(total: i64) -> Invoice {
        let due = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let mut invoice = Invoice::new(InvoiceType::Outgoing, Currency::XOF, due);
        invoice.add_item(InvoiceItem::new("Tuition", xof(total))).unwrap();
        invoice
    }

    fn completed(invoice: &Invoice, amount: i64) -> Payment {
        let mut p = Payment::new(invoice.id, xof(amount), PaymentMethod::Cash);
        p.complete().unwrap();
        p
    }

    #[test]
    fn test_status_rule() {
        let id = InvoiceId::new();
        assert_eq!(status_for_paid(id, xof(0), xof(100)).unwrap(), InvoiceStatus::Pending);
        assert_eq!(status_for_paid(id, xof(40), xof(100)).unwrap(), InvoiceStatus::Partial);
        assert_eq!(status_for_paid(id, xof(100), xof(100)).unwrap(), InvoiceStatus::Paid);
        assert!(status_for_paid(id, xof(101), xof(100)).unwrap_err().is_integrity());
    }

    #[test]
    fn test_pending_and_voided_payments_do_not_count() {
        let inv = invoice(100_000);
        let pending = Payment::new(inv.id, xof(50_000), PaymentMethod::Card);
        let mut voided = completed(&inv, 50_000);
        voided.void("duplicate").unwrap();

        assert_eq!(paid_amount(&inv, &[pending, voided]).unwrap(), xof(0));
    }

    #[test]
    fn test_payments_for_other_invoices_are_ignored() {
        let inv = invoice(100_000);
        let other = invoice(100_000);
        let foreign = completed(&other, 100_000);

        assert_eq!(compute_status(&inv, &[foreign]).unwrap(), InvoiceStatus::Pending);
    }

    #[test]
    fn test_fund_effect_direction() {
        assert_eq!(fund_effect(InvoiceType::Outgoing, xof(500)).unwrap(), xof(500));
        assert_eq!(fund_effect(InvoiceType::Incoming, xof(500)).unwrap(), xof(-500));
    }
}
