//! Fund Domain
//!
//! This crate implements the school's internal funds: budget pots that are
//! credited by student payments, debited by supplier payments, and that can
//! lend to each other.
//!
//! # Key Concepts
//!
//! - **Fund**: an account with a materialized balance
//! - **Fund Transaction**: an immutable, signed ledger entry; corrections are
//!   new reversing entries, never edits
//! - **Fund Loan**: principal moved from a lender fund to a borrower fund and
//!   later returned
//!
//! # Balance Invariant
//!
//! A fund's balance always equals the sum of its ledger entries, and never
//! drops below zero unless the fund is flagged as allowed to run a deficit.

pub mod fund;
pub mod transaction;
pub mod ledger;
pub mod loan;
pub mod error;

pub use fund::{Fund, FundSnapshot};
pub use transaction::{FundTransaction, TransactionLink};
pub use loan::{FundLoan, LoanStatus, LoanMovement};
pub use error::FundError;
