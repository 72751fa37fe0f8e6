//! Fund ledger entries
//!
//! A `FundTransaction` records one signed change to one fund. Entries are
//! created by the ledger and never modified afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{FundId, FundLoanId, FundTransactionId, Money, PaymentId};

/// What caused a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TransactionLink {
    Payment(PaymentId),
    Loan(FundLoanId),
}

impl TransactionLink {
    pub fn payment_id(&self) -> Option<PaymentId> {
        match self {
            TransactionLink::Payment(id) => Some(*id),
            TransactionLink::Loan(_) => None,
        }
    }

    pub fn loan_id(&self) -> Option<FundLoanId> {
        match self {
            TransactionLink::Loan(id) => Some(*id),
            TransactionLink::Payment(_) => None,
        }
    }
}

impl fmt::Display for TransactionLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionLink::Payment(id) => write!(f, "payment {}", id),
            TransactionLink::Loan(id) => write!(f, "loan {}", id),
        }
    }
}

/// An immutable ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundTransaction {
    pub id: FundTransactionId,
    pub fund_id: FundId,
    /// Positive credits the fund, negative debits it
    pub amount: Money,
    pub link: TransactionLink,
    /// The entry this one offsets, if it is a reversal
    pub reverses: Option<FundTransactionId>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FundTransaction {
    pub(crate) fn new(
        fund_id: FundId,
        amount: Money,
        link: TransactionLink,
        reverses: Option<FundTransactionId>,
        description: Option<String>,
    ) -> Self {
        Self {
            id: FundTransactionId::new_v7(),
            fund_id,
            amount,
            link,
            reverses,
            description,
            created_at: Utc::now(),
        }
    }

    pub fn is_reversal(&self) -> bool {
        self.reverses.is_some()
    }
}
