//! Repository implementations for domain entities
//!
//! Repositories encapsulate SQL and map between database rows and domain
//! types. Every method that reads or writes inside a unit of work takes the
//! caller's `&mut PgConnection` (usually `&mut *tx`), so that several
//! repositories can share one transaction and its row locks. Queries are
//! checked at runtime with `query_as` and `FromRow` rows.
//!
//! Money columns are stored as `BIGINT` minor units next to a currency code.

pub mod invoice;
pub mod payment;
pub mod fund;
pub mod loan;

pub use invoice::InvoiceRepository;
pub use payment::PaymentRepository;
pub use fund::FundRepository;
pub use loan::LoanRepository;

use core_kernel::{Currency, Money};

use crate::error::DatabaseError;

/// Rebuilds a `Money` from its stored columns
pub(crate) fn money(minor: i64, currency: &str) -> Result<Money, DatabaseError> {
    let currency: Currency = currency
        .parse()
        .map_err(|e| DatabaseError::CorruptRow(format!("{e}")))?;
    Ok(Money::from_minor(minor, currency))
}
