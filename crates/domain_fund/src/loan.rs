//! Inter-fund loans
//!
//! A loan moves principal from a lender fund to a borrower fund when it is
//! approved, and back when it is repaid. The loan itself only tracks the
//! lifecycle; the balance movements it returns are posted through the ledger
//! so the usual deficit and activity rules apply.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{FundId, FundLoanId, Money};

use crate::error::FundError;

/// Loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Pending,
    Approved,
    Repaid,
    Overdue,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoanStatus::Pending => "PENDING",
            LoanStatus::Approved => "APPROVED",
            LoanStatus::Repaid => "REPAID",
            LoanStatus::Overdue => "OVERDUE",
        })
    }
}

/// A signed change to one fund caused by a loan transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanMovement {
    pub fund_id: FundId,
    pub amount: Money,
}

/// A loan between two funds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundLoan {
    pub id: FundLoanId,
    pub lender_fund_id: FundId,
    pub borrower_fund_id: FundId,
    pub principal: Money,
    pub status: LoanStatus,
    pub due_date: NaiveDate,
    pub approved_at: Option<DateTime<Utc>>,
    pub repaid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FundLoan {
    /// Creates a pending loan
    ///
    /// # Errors
    ///
    /// `InvalidLoan` if both sides are the same fund or the principal is not
    /// positive.
    pub fn new(
        lender_fund_id: FundId,
        borrower_fund_id: FundId,
        principal: Money,
        due_date: NaiveDate,
    ) -> Result<Self, FundError> {
        if lender_fund_id == borrower_fund_id {
            return Err(FundError::InvalidLoan(
                "lender and borrower must be different funds".to_string(),
            ));
        }
        if !principal.is_positive() {
            return Err(FundError::InvalidLoan(format!(
                "principal must be positive, got {}",
                principal
            )));
        }

        let now = Utc::now();
        Ok(Self {
            id: FundLoanId::new_v7(),
            lender_fund_id,
            borrower_fund_id,
            principal,
            status: LoanStatus::Pending,
            due_date,
            approved_at: None,
            repaid_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Approves the loan and returns the disbursement
    ///
    /// The lender is debited first, then the borrower is credited.
    pub fn approve(&mut self) -> Result<[LoanMovement; 2], FundError> {
        self.transition(LoanStatus::Approved)?;
        self.approved_at = Some(self.updated_at);

        Ok([
            LoanMovement {
                fund_id: self.lender_fund_id,
                amount: self.principal.checked_neg()?,
            },
            LoanMovement {
                fund_id: self.borrower_fund_id,
                amount: self.principal,
            },
        ])
    }

    /// Repays the loan and returns the movements back to the lender
    pub fn repay(&mut self) -> Result<[LoanMovement; 2], FundError> {
        self.transition(LoanStatus::Repaid)?;
        self.repaid_at = Some(self.updated_at);

        Ok([
            LoanMovement {
                fund_id: self.borrower_fund_id,
                amount: self.principal.checked_neg()?,
            },
            LoanMovement {
                fund_id: self.lender_fund_id,
                amount: self.principal,
            },
        ])
    }

    /// Flags an approved loan as overdue once `today` is past the due date
    ///
    /// Returns whether the status changed. Loans in any other state, or not
    /// yet due, are left alone.
    pub fn mark_overdue(&mut self, today: NaiveDate) -> bool {
        if self.status == LoanStatus::Approved && today > self.due_date {
            self.status = LoanStatus::Overdue;
            self.updated_at = Utc::now();
            return true;
        }
        false
    }

    fn transition(&mut self, to: LoanStatus) -> Result<(), FundError> {
        let allowed = matches!(
            (self.status, to),
            (LoanStatus::Pending, LoanStatus::Approved)
                | (LoanStatus::Approved, LoanStatus::Repaid)
                | (LoanStatus::Overdue, LoanStatus::Repaid)
        );
        if !allowed {
            return Err(FundError::InvalidLoanTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;

    fn loan() -> FundLoan {
        FundLoan::new(
            FundId::new(),
            FundId::new(),
            Money::from_minor(20_000, Currency::XOF),
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_same_fund_rejected() {
        let fund = FundId::new();
        let result = FundLoan::new(
            fund,
            fund,
            Money::from_minor(1, Currency::XOF),
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        );
        assert!(matches!(result, Err(FundError::InvalidLoan(_))));
    }

    #[test]
    fn test_repay_before_approval_rejected() {
        let mut loan = loan();
        let err = loan.repay().unwrap_err();
        assert!(matches!(
            err,
            FundError::InvalidLoanTransition {
                from: LoanStatus::Pending,
                to: LoanStatus::Repaid
            }
        ));
    }

    #[test]
    fn test_overdue_only_after_due_date() {
        let mut loan = loan();
        loan.approve().unwrap();

        assert!(!loan.mark_overdue(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()));
        assert!(loan.mark_overdue(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()));
        assert_eq!(loan.status, LoanStatus::Overdue);
        assert!(loan.repay().is_ok());
    }
}
