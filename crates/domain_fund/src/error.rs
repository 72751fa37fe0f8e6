//! Fund domain errors

use thiserror::Error;

use core_kernel::{FundId, FundLoanId, FundTransactionId, Money, MoneyError};

use crate::loan::LoanStatus;
use crate::transaction::TransactionLink;

/// Errors that can occur in the fund domain
#[derive(Debug, Error)]
pub enum FundError {
    #[error("Fund not found: {0}")]
    FundNotFound(FundId),

    #[error("Fund transaction not found: {0}")]
    TransactionNotFound(FundTransactionId),

    #[error("Loan not found: {0}")]
    LoanNotFound(FundLoanId),

    #[error("Insufficient funds in {fund_id}: balance {balance}, attempted {attempted}")]
    InsufficientFunds {
        fund_id: FundId,
        balance: Money,
        attempted: Money,
    },

    #[error("Fund {0} is inactive")]
    FundInactive(FundId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Fund transaction {0} has already been reversed")]
    AlreadyReversed(FundTransactionId),

    #[error("Fund transaction {0} is a reversal and cannot itself be reversed")]
    ReversalOfReversal(FundTransactionId),

    #[error("Fund transaction {transaction_id} settles {link}; void the payment or settle the loan instead")]
    SettlementEntry {
        transaction_id: FundTransactionId,
        link: TransactionLink,
    },

    #[error("Invalid loan: {0}")]
    InvalidLoan(String),

    #[error("Invalid loan transition from {from} to {to}")]
    InvalidLoanTransition { from: LoanStatus, to: LoanStatus },

    #[error("Integrity violation on fund {fund_id}: stored balance {stored}, ledger sum {ledger}")]
    Integrity {
        fund_id: FundId,
        stored: Money,
        ledger: Money,
    },

    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl FundError {
    /// True for errors that indicate corrupted data rather than a bad request
    pub fn is_integrity(&self) -> bool {
        matches!(self, FundError::Integrity { .. })
    }
}
