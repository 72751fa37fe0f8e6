//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for invoices, payments and funds. The
//! amounts mirror real tuition and supply bills in XOF, which has no minor
//! unit, so minor and major amounts are the same number.

use chrono::NaiveDate;
use core_kernel::{Currency, Money, StudentId};
use uuid::Uuid;

/// Shorthand for an XOF amount
pub fn xof(amount: i64) -> Money {
    Money::from_minor(amount, Currency::XOF)
}

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// A term's tuition
    pub fn tuition() -> Money {
        xof(100_000)
    }

    /// A partial tuition payment
    pub fn first_instalment() -> Money {
        xof(80_000)
    }

    /// A supplier bill for books
    pub fn book_supply() -> Money {
        xof(200_000)
    }

    /// Creates a zero amount
    pub fn xof_zero() -> Money {
        Money::zero(Currency::XOF)
    }

    /// Creates a EUR amount for currency mismatch tests
    pub fn eur_100() -> Money {
        Money::from_minor(10_000, Currency::EUR)
    }
}

/// Fixture for calendar dates
pub struct DateFixtures;

impl DateFixtures {
    /// End of the first term
    pub fn term_due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
    }

    /// A day after the term due date
    pub fn after_due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
    }

    /// Loan due date used by fund loan tests
    pub fn loan_due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }
}

/// Fixture for string test data
pub struct StringFixtures;

impl StringFixtures {
    pub fn canteen_code() -> &'static str {
        "CANTEEN"
    }

    pub fn library_code() -> &'static str {
        "LIBRARY"
    }

    pub fn supplier() -> &'static str {
        "Librairie du Plateau"
    }

    pub fn bursar() -> &'static str {
        "bursar@school.test"
    }

    pub fn cancel_reason() -> &'static str {
        "Student withdrew before term start"
    }

    pub fn void_reason() -> &'static str {
        "Duplicate entry"
    }
}

/// Fixture for stable identifiers
pub struct IdFixtures;

impl IdFixtures {
    /// A student id that is the same in every test run
    pub fn student_id() -> StudentId {
        StudentId::from_uuid(Uuid::from_u128(0x5ca1ab1e_0000_4000_8000_000000000001))
    }
}

/// Returns a fund code unique enough to avoid collisions on a shared database
pub fn unique_code(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}
