//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for domain types that give
//! more meaningful error messages than standard assertions.

use core_kernel::Money;
use domain_billing::{reconciliation, Invoice, InvoiceStatus, Payment};
use domain_fund::{ledger, Fund, FundTransaction};

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(money.is_zero(), "Expected zero money, got {}", money);
}

/// Asserts that money values sum to a total
///
/// # Panics
///
/// Panics if the sum doesn't equal the total or the currencies differ
pub fn assert_money_sum(parts: &[Money], total: &Money) {
    let sum = Money::checked_sum(parts, total.currency()).expect("parts must share the total's currency");
    assert_eq!(sum, *total, "Money sum mismatch: sum={}, expected={}", sum, total);
}

/// Asserts an invoice's stored status
pub fn assert_invoice_status(invoice: &Invoice, expected: InvoiceStatus) {
    assert_eq!(
        invoice.status(),
        expected,
        "Invoice {} has status {}, expected {}",
        invoice.invoice_number,
        invoice.status(),
        expected
    );
}

/// Asserts that the stored status equals the status computed from payments
/// and that the completed sum does not exceed the total
pub fn assert_invoice_reconciled(invoice: &Invoice, payments: &[Payment]) {
    if let Err(e) = reconciliation::verify(invoice, payments) {
        panic!("Invoice {} is not reconciled: {}", invoice.invoice_number, e);
    }
}

/// Asserts that a fund's balance equals the sum of its ledger entries
pub fn assert_fund_balanced(fund: &Fund, entries: &[FundTransaction]) {
    if let Err(e) = ledger::verify_balance(fund, entries) {
        panic!("Fund {} is out of balance: {}", fund.code, e);
    }
}

/// Asserts a fund balance in minor units
pub fn assert_fund_balance(fund: &Fund, expected_minor: i64) {
    assert_eq!(
        fund.balance().minor(),
        expected_minor,
        "Fund {} balance is {}, expected {}",
        fund.code,
        fund.balance(),
        expected_minor
    );
}
