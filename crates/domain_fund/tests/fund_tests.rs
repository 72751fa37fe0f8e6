//! Comprehensive tests for domain_fund

use chrono::NaiveDate;
use proptest::prelude::*;

use core_kernel::{Currency, FundId, FundLoanId, Money, PaymentId};

use domain_fund::fund::{Fund, FundSnapshot};
use domain_fund::ledger;
use domain_fund::loan::{FundLoan, LoanStatus};
use domain_fund::transaction::{FundTransaction, TransactionLink};
use domain_fund::{FundError, LoanMovement};

fn xof(minor: i64) -> Money {
    Money::from_minor(minor, Currency::XOF)
}

fn payment_link() -> TransactionLink {
    TransactionLink::Payment(PaymentId::new())
}

fn funded(code: &str, minor: i64) -> (Fund, Vec<FundTransaction>) {
    let mut fund = Fund::new(code, code, Currency::XOF);
    let txn = ledger::apply(&mut fund, xof(minor), payment_link(), None).unwrap();
    (fund, vec![txn])
}

fn due() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
}

// ============================================================================
// Ledger Tests
// ============================================================================

mod ledger_tests {
    use super::*;

    #[test]
    fn test_debit_beyond_balance_rejected() {
        let (mut fund, ledger_entries) = funded("CANTEEN", 50_000);

        let err = ledger::apply(&mut fund, xof(-70_000), payment_link(), None).unwrap_err();

        match err {
            FundError::InsufficientFunds { balance, attempted, .. } => {
                assert_eq!(balance, xof(50_000));
                assert_eq!(attempted, xof(-70_000));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fund.balance(), xof(50_000));
        assert_eq!(ledger::verify_balance(&fund, &ledger_entries).unwrap(), xof(50_000));
    }

    #[test]
    fn test_debit_to_exactly_zero_allowed() {
        let (mut fund, _) = funded("CANTEEN", 50_000);
        ledger::apply(&mut fund, xof(-50_000), payment_link(), None).unwrap();
        assert!(fund.balance().is_zero());
    }

    #[test]
    fn test_deficit_fund_may_go_negative() {
        let mut fund = Fund::new("BLD", "Building", Currency::XOF).allowing_deficit();
        ledger::apply(&mut fund, xof(-10_000), payment_link(), None).unwrap();
        assert_eq!(fund.balance(), xof(-10_000));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let mut fund = Fund::new("LIB", "Library", Currency::XOF);
        let err = ledger::apply(&mut fund, xof(0), payment_link(), None).unwrap_err();
        assert!(matches!(err, FundError::InvalidAmount(_)));
    }

    #[test]
    fn test_currency_mismatch_rejected() {
        let mut fund = Fund::new("LIB", "Library", Currency::XOF);
        let err = ledger::apply(
            &mut fund,
            Money::from_minor(100, Currency::EUR),
            payment_link(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, FundError::InvalidAmount(_)));
    }

    #[test]
    fn test_inactive_fund_rejects_new_transactions() {
        let (mut fund, _) = funded("LIB", 1_000);
        fund.deactivate();

        let err = ledger::apply(&mut fund, xof(500), payment_link(), None).unwrap_err();
        assert!(matches!(err, FundError::FundInactive(id) if id == fund.id));
    }

    #[test]
    fn test_divergent_balance_detected() {
        let (fund, _) = funded("LIB", 1_000);
        let snapshot = FundSnapshot {
            id: fund.id,
            code: fund.code.clone(),
            name: fund.name.clone(),
            description: None,
            currency: fund.currency,
            balance: xof(2_000),
            allows_deficit: false,
            is_active: true,
            created_at: fund.created_at,
            updated_at: fund.updated_at,
        };
        let tampered = Fund::from(snapshot);
        let (_, entries) = funded("OTHER", 1_000);
        let entries: Vec<FundTransaction> = entries
            .into_iter()
            .map(|mut t| {
                t.fund_id = tampered.id;
                t
            })
            .collect();

        let err = ledger::verify_balance(&tampered, &entries).unwrap_err();
        assert!(err.is_integrity());
    }

    #[test]
    fn test_fund_json_rebuilds_through_snapshot() {
        let (fund, entries) = funded("LIB", 1_000);

        let json = serde_json::to_string(&fund).unwrap();
        let restored = Fund::from(serde_json::from_str::<FundSnapshot>(&json).unwrap());

        assert_eq!(restored.balance(), xof(1_000));
        assert_eq!(ledger::verify_balance(&restored, &entries).unwrap(), xof(1_000));
    }
}

// ============================================================================
// Reversal Tests
// ============================================================================

mod reversal_tests {
    use super::*;

    #[test]
    fn test_double_reversal_rejected() {
        let (mut fund, entries) = funded("LIB", 5_000);
        let original = &entries[0];

        ledger::reverse(&mut fund, original, false).unwrap();
        let err = ledger::reverse(&mut fund, original, true).unwrap_err();

        assert!(matches!(err, FundError::AlreadyReversed(id) if id == original.id));
        assert!(fund.balance().is_zero());
    }

    #[test]
    fn test_reversal_of_reversal_rejected() {
        let (mut fund, entries) = funded("LIB", 5_000);
        let reversal = ledger::reverse(&mut fund, &entries[0], false).unwrap();

        let err = ledger::reverse(&mut fund, &reversal, false).unwrap_err();
        assert!(matches!(err, FundError::ReversalOfReversal(id) if id == reversal.id));
    }

    #[test]
    fn test_reversal_subject_to_deficit_rule() {
        let (mut fund, entries) = funded("LIB", 5_000);
        ledger::apply(&mut fund, xof(-4_000), payment_link(), None).unwrap();

        let err = ledger::reverse(&mut fund, &entries[0], false).unwrap_err();
        assert!(matches!(err, FundError::InsufficientFunds { .. }));
    }

    #[test]
    fn test_reversal_allowed_on_inactive_fund() {
        let (mut fund, entries) = funded("LIB", 5_000);
        fund.deactivate();

        let reversal = ledger::reverse(&mut fund, &entries[0], false).unwrap();
        assert_eq!(reversal.amount, xof(-5_000));
        assert!(fund.balance().is_zero());
    }

    #[test]
    fn test_reversal_of_foreign_transaction_rejected() {
        let (_, entries) = funded("LIB", 5_000);
        let mut other = Fund::new("SPORT", "Sports", Currency::XOF);

        assert!(ledger::reverse(&mut other, &entries[0], false).is_err());
    }
}

// ============================================================================
// Loan Tests
// ============================================================================

mod loan_tests {
    use super::*;

    fn post(funds: &mut [&mut Fund; 2], loan_id: FundLoanId, movements: [LoanMovement; 2]) {
        for movement in movements {
            let fund = funds
                .iter_mut()
                .find(|f| f.id == movement.fund_id)
                .unwrap();
            ledger::apply(fund, movement.amount, TransactionLink::Loan(loan_id), None).unwrap();
        }
    }

    #[test]
    fn test_loan_lifecycle_conserves_total() {
        let (mut lender, _) = funded("POOL", 100_000);
        let mut borrower = Fund::new("TRIP", "School trip", Currency::XOF);
        let mut loan = FundLoan::new(lender.id, borrower.id, xof(30_000), due()).unwrap();
        let total_before = lender.balance().minor() + borrower.balance().minor();

        let movements = loan.approve().unwrap();
        post(&mut [&mut lender, &mut borrower], loan.id, movements);

        assert_eq!(loan.status, LoanStatus::Approved);
        assert!(loan.approved_at.is_some());
        assert_eq!(lender.balance(), xof(70_000));
        assert_eq!(borrower.balance(), xof(30_000));

        let movements = loan.repay().unwrap();
        post(&mut [&mut lender, &mut borrower], loan.id, movements);

        assert_eq!(loan.status, LoanStatus::Repaid);
        assert!(loan.repaid_at.is_some());
        assert_eq!(lender.balance(), xof(100_000));
        assert!(borrower.balance().is_zero());
        assert_eq!(lender.balance().minor() + borrower.balance().minor(), total_before);
    }

    #[test]
    fn test_approve_twice_rejected() {
        let mut loan = FundLoan::new(
            FundId::new(),
            FundId::new(),
            xof(1_000),
            due(),
        )
        .unwrap();
        loan.approve().unwrap();

        assert!(matches!(
            loan.approve(),
            Err(FundError::InvalidLoanTransition { from: LoanStatus::Approved, .. })
        ));
    }

    #[test]
    fn test_lender_without_balance_cannot_disburse() {
        let mut lender = Fund::new("POOL", "Pool", Currency::XOF);
        let mut loan = FundLoan::new(lender.id, FundId::new(), xof(1_000), due()).unwrap();
        let movements = loan.approve().unwrap();

        let err = ledger::apply(&mut lender, movements[0].amount, TransactionLink::Loan(loan.id), None)
            .unwrap_err();
        assert!(matches!(err, FundError::InsufficientFunds { .. }));
    }

    #[test]
    fn test_loan_status_serializes_screaming_case() {
        assert_eq!(serde_json::to_string(&LoanStatus::Overdue).unwrap(), "\"OVERDUE\"");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod property_tests {
    use super::*;

    proptest! {
        #[test]
        fn prop_balance_equals_ledger_sum(amounts in prop::collection::vec(-50_000i64..50_000, 1..40)) {
            let mut fund = Fund::new("PROP", "Property", Currency::XOF);
            let mut entries = Vec::new();

            for amount in amounts {
                if let Ok(txn) = ledger::apply(&mut fund, xof(amount), payment_link(), None) {
                    entries.push(txn);
                }
                prop_assert!(!fund.balance().is_negative());
            }

            prop_assert_eq!(ledger::verify_balance(&fund, &entries).unwrap(), fund.balance());
        }

        #[test]
        fn prop_reversing_everything_returns_to_zero(amounts in prop::collection::vec(1i64..10_000, 1..20)) {
            let mut fund = Fund::new("PROP", "Property", Currency::XOF);
            let entries: Vec<FundTransaction> = amounts
                .iter()
                .map(|a| ledger::apply(&mut fund, xof(*a), payment_link(), None).unwrap())
                .collect();

            for entry in entries.iter().rev() {
                ledger::reverse(&mut fund, entry, false).unwrap();
            }

            prop_assert!(fund.balance().is_zero());
        }
    }
}
