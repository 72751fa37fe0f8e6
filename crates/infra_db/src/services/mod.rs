//! Transactional services
//!
//! Each public operation runs in exactly one database transaction: it locks
//! the rows it touches, applies the pure domain rules to the locked state,
//! writes the results, and commits. Dropping the transaction on an error
//! path rolls everything back, so a failed operation leaves no partial
//! writes.
//!
//! # Lock Order
//!
//! Rows are always locked invoice (or loan) first, then funds in ascending
//! id order. Following one global order keeps concurrent operations from
//! deadlocking on each other.

pub mod reconciler;
pub mod fund_ledger;
pub mod audit;

pub use reconciler::{Reconciler, RecordPayment};
pub use fund_ledger::{FundLedger, NewLoan};
pub use audit::{IntegrityAuditor, IntegrityFinding, IntegrityReport};

use crate::error::ServiceError;

/// Converts into a `ServiceError`, raising an alert for integrity violations
///
/// Integrity violations mean stored data already breaks an invariant. They
/// are never auto-corrected here, only logged for an operator.
pub(crate) fn alert<E: Into<ServiceError>>(error: E) -> ServiceError {
    let error = error.into();
    if error.is_integrity() {
        tracing::error!(alert = "integrity", error = %error, "Integrity violation detected");
    }
    error
}
