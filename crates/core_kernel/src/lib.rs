//! Core Kernel - Foundational types for the school finance system
//!
//! This crate provides the building blocks shared by the billing and fund
//! domains:
//! - Money held as integer minor units, never floating point
//! - Strongly typed identifiers for every persisted entity

pub mod money;
pub mod identifiers;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{
    InvoiceId, LineItemId, PaymentId, StudentId,
    FundId, FundTransactionId, FundLoanId,
};
