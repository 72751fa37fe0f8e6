//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use core_kernel::{Currency, Money};
use proptest::prelude::*;

/// Strategy for generating supported Currency values
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::XOF),
        Just(Currency::XAF),
        Just(Currency::EUR),
        Just(Currency::USD),
        Just(Currency::GBP),
        Just(Currency::KES),
        Just(Currency::NGN),
        Just(Currency::MAD),
        Just(Currency::JPY),
    ]
}

/// Strategy for generating valid positive amounts in minor units
pub fn positive_amount_minor_strategy() -> impl Strategy<Value = i64> {
    1i64..1_000_000_000i64
}

/// Strategy for generating signed, non-zero ledger amounts
pub fn ledger_amount_minor_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![-1_000_000i64..-1, 1i64..1_000_000]
}

/// Strategy for generating valid Money values with positive amounts
pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    (positive_amount_minor_strategy(), currency_strategy())
        .prop_map(|(amount, currency)| Money::from_minor(amount, currency))
}

/// Strategy for an invoice total together with payment amounts that add up
/// to no more than it
///
/// Produces `(total, payments)` with every payment positive.
pub fn total_and_payments_strategy() -> impl Strategy<Value = (i64, Vec<i64>)> {
    (1i64..10_000_000).prop_flat_map(|total| {
        let max_count = total.min(12) as usize;
        prop::collection::vec(1i64..=total, 1..=max_count).prop_map(move |raw| {
            let mut remaining = total;
            let payments = raw
                .into_iter()
                .filter_map(|p| {
                    let p = p.min(remaining);
                    remaining -= p;
                    (p > 0).then_some(p)
                })
                .collect();
            (total, payments)
        })
    })
}
