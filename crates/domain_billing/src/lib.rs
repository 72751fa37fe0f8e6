//! Billing Domain - Invoices, Payments and Status Reconciliation
//!
//! This crate holds the rules that keep an invoice's status consistent with
//! the money actually received (or paid out) against it.
//!
//! # Invoice Status
//!
//! An invoice's status is derived, never assigned:
//! - **Pending**: no completed payment yet
//! - **Partial**: some, but not all, of the total has been paid
//! - **Paid**: completed payments sum exactly to the total
//! - **Cancelled**: terminal; set only by [`Invoice::cancel`]
//!
//! A completed payment sum above the total is an integrity violation. It is
//! surfaced as [`BillingError::Integrity`] and never clamped.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{reconciliation, Invoice, Payment};
//!
//! let check = reconciliation::check_payment(&invoice, &payments, amount)?;
//! let mut payment = Payment::new(invoice.id, amount, PaymentMethod::Cash);
//! payment.complete()?;
//! payments.push(payment);
//! let status = invoice.reconcile(&payments)?;
//! assert_eq!(status, check.status_after);
//! ```

pub mod invoice;
pub mod payment;
pub mod reconciliation;
pub mod error;

pub use invoice::{Invoice, InvoiceItem, InvoiceSnapshot, InvoiceStatus, InvoiceType, Cancellation};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use reconciliation::{compute_status, check_payment, PaymentCheck, InvoiceSummary};
pub use error::{BillingError, IntegrityViolation};
