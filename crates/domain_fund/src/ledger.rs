//! Fund balance ledger
//!
//! Every balance change goes through [`apply`] or [`reverse`], which update
//! the fund's materialized balance and return the ledger entry the caller
//! must append in the same storage transaction.
//!
//! # Invariants
//!
//! - `fund.balance() == ledger_balance(entries)` at all times
//! - balance never goes below zero unless `fund.allows_deficit`
//! - an entry is reversed at most once, and reversals are never reversed

use chrono::Utc;

use core_kernel::Money;

use crate::error::FundError;
use crate::fund::Fund;
use crate::transaction::{FundTransaction, TransactionLink};

/// Applies a signed amount to a fund
///
/// # Arguments
///
/// * `fund` - The fund, loaded under lock by the caller
/// * `amount` - Positive to credit, negative to debit
/// * `link` - The payment or loan that caused the movement
/// * `description` - Free text for statements
///
/// # Errors
///
/// - `FundInactive` if the fund is closed
/// - `InvalidAmount` for zero or a foreign currency
/// - `InsufficientFunds` if a non-deficit fund would go negative
pub fn apply(
    fund: &mut Fund,
    amount: Money,
    link: TransactionLink,
    description: Option<String>,
) -> Result<FundTransaction, FundError> {
    if !fund.is_active {
        return Err(FundError::FundInactive(fund.id));
    }
    post(fund, amount, link, None, description)
}

/// Appends the equal-and-opposite entry of `original`
///
/// Reversals are accepted on inactive funds so that closed funds can still
/// be corrected. The deficit rule still applies.
///
/// # Arguments
///
/// * `fund` - The fund `original` belongs to
/// * `original` - The entry to offset
/// * `already_reversed` - Whether a reversal of `original` already exists
pub fn reverse(
    fund: &mut Fund,
    original: &FundTransaction,
    already_reversed: bool,
) -> Result<FundTransaction, FundError> {
    if original.fund_id != fund.id {
        return Err(FundError::InvalidAmount(format!(
            "transaction {} belongs to {}, not {}",
            original.id, original.fund_id, fund.id
        )));
    }
    if original.is_reversal() {
        return Err(FundError::ReversalOfReversal(original.id));
    }
    if already_reversed {
        return Err(FundError::AlreadyReversed(original.id));
    }

    let amount = original.amount.checked_neg()?;
    post(
        fund,
        amount,
        original.link,
        Some(original.id),
        Some(format!("Reversal of {}", original.id)),
    )
}

/// Checks that `original` may be reversed on its own
///
/// Entries posted by a loan belong to the loan's lifecycle, and the entry
/// that settles a payment belongs to that payment. They are offset by
/// repaying the loan or voiding the payment, never directly.
///
/// # Arguments
///
/// * `original` - The entry a caller asked to reverse
/// * `settles_payment` - Whether `original` is its payment's settlement entry
pub fn ensure_standalone_reversal(original: &FundTransaction, settles_payment: bool) -> Result<(), FundError> {
    let owned = match original.link {
        TransactionLink::Loan(_) => !original.is_reversal(),
        TransactionLink::Payment(_) => settles_payment,
    };
    if owned {
        return Err(FundError::SettlementEntry {
            transaction_id: original.id,
            link: original.link,
        });
    }
    Ok(())
}

fn post(
    fund: &mut Fund,
    amount: Money,
    link: TransactionLink,
    reverses: Option<core_kernel::FundTransactionId>,
    description: Option<String>,
) -> Result<FundTransaction, FundError> {
    if amount.is_zero() {
        return Err(FundError::InvalidAmount("transaction amount must be non-zero".to_string()));
    }
    if amount.currency() != fund.currency {
        return Err(FundError::InvalidAmount(format!(
            "transaction currency {} does not match fund currency {}",
            amount.currency(),
            fund.currency
        )));
    }

    let new_balance = fund.balance.checked_add(&amount)?;
    if new_balance.is_negative() && !fund.allows_deficit {
        return Err(FundError::InsufficientFunds {
            fund_id: fund.id,
            balance: fund.balance,
            attempted: amount,
        });
    }

    fund.balance = new_balance;
    fund.updated_at = Utc::now();

    tracing::debug!(
        fund_id = %fund.id,
        amount = %amount,
        balance = %new_balance,
        "Fund transaction posted"
    );

    Ok(FundTransaction::new(fund.id, amount, link, reverses, description))
}

/// Sums a fund's ledger from inception
pub fn ledger_balance(fund: &Fund, entries: &[FundTransaction]) -> Result<Money, FundError> {
    let amounts: Vec<Money> = entries
        .iter()
        .filter(|t| t.fund_id == fund.id)
        .map(|t| t.amount)
        .collect();
    Ok(Money::checked_sum(&amounts, fund.currency)?)
}

/// Compares the materialized balance with the ledger sum
///
/// # Errors
///
/// `Integrity` when they differ. Never corrected automatically.
pub fn verify_balance(fund: &Fund, entries: &[FundTransaction]) -> Result<Money, FundError> {
    let ledger = ledger_balance(fund, entries)?;
    if ledger != fund.balance() {
        return Err(FundError::Integrity {
            fund_id: fund.id,
            stored: fund.balance(),
            ledger,
        });
    }
    Ok(ledger)
}
