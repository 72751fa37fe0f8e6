//! Fund, ledger and loan DTOs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use core_kernel::{FundId, FundLoanId, FundTransactionId, PaymentId};
use domain_fund::{Fund, FundLoan, FundTransaction, LoanStatus, TransactionLink};

use super::MoneyDto;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFundRequest {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(equal = 3))]
    pub currency: String,
    #[serde(default)]
    pub allows_deficit: bool,
}

/// A manual ledger entry; exactly one of `payment_id` and `loan_id` names
/// what it belongs to
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_single_link"))]
pub struct ApplyTransactionRequest {
    pub amount: MoneyDto,
    pub payment_id: Option<Uuid>,
    pub loan_id: Option<Uuid>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

impl ApplyTransactionRequest {
    pub fn link(&self) -> Option<TransactionLink> {
        match (self.payment_id, self.loan_id) {
            (Some(payment_id), None) => Some(TransactionLink::Payment(payment_id.into())),
            (None, Some(loan_id)) => Some(TransactionLink::Loan(loan_id.into())),
            _ => None,
        }
    }
}

fn validate_single_link(request: &ApplyTransactionRequest) -> Result<(), ValidationError> {
    if request.link().is_none() {
        let mut error = ValidationError::new("single_link");
        error.message = Some("exactly one of payment_id and loan_id is required".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_distinct_funds"))]
pub struct CreateLoanRequest {
    pub lender_fund_id: Uuid,
    pub borrower_fund_id: Uuid,
    pub principal: MoneyDto,
    pub due_date: NaiveDate,
}

fn validate_distinct_funds(request: &CreateLoanRequest) -> Result<(), ValidationError> {
    if request.lender_fund_id == request.borrower_fund_id {
        let mut error = ValidationError::new("distinct_funds");
        error.message = Some("lender and borrower must be different funds".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct OverdueQuery {
    /// Defaults to today (UTC)
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct FundResponse {
    pub id: FundId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub currency: String,
    pub balance: MoneyDto,
    pub allows_deficit: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Fund> for FundResponse {
    fn from(fund: &Fund) -> Self {
        Self {
            id: fund.id,
            code: fund.code.clone(),
            name: fund.name.clone(),
            description: fund.description.clone(),
            currency: fund.currency.code().to_string(),
            balance: fund.balance().into(),
            allows_deficit: fund.allows_deficit,
            is_active: fund.is_active,
            created_at: fund.created_at,
            updated_at: fund.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FundTransactionResponse {
    pub id: FundTransactionId,
    pub fund_id: FundId,
    pub amount: MoneyDto,
    pub payment_id: Option<PaymentId>,
    pub loan_id: Option<FundLoanId>,
    pub reverses: Option<FundTransactionId>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&FundTransaction> for FundTransactionResponse {
    fn from(txn: &FundTransaction) -> Self {
        Self {
            id: txn.id,
            fund_id: txn.fund_id,
            amount: txn.amount.into(),
            payment_id: txn.link.payment_id(),
            loan_id: txn.link.loan_id(),
            reverses: txn.reverses,
            description: txn.description.clone(),
            created_at: txn.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoanResponse {
    pub id: FundLoanId,
    pub lender_fund_id: FundId,
    pub borrower_fund_id: FundId,
    pub principal: MoneyDto,
    pub status: LoanStatus,
    pub due_date: NaiveDate,
    pub approved_at: Option<DateTime<Utc>>,
    pub repaid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&FundLoan> for LoanResponse {
    fn from(loan: &FundLoan) -> Self {
        Self {
            id: loan.id,
            lender_fund_id: loan.lender_fund_id,
            borrower_fund_id: loan.borrower_fund_id,
            principal: loan.principal.into(),
            status: loan.status,
            due_date: loan.due_date,
            approved_at: loan.approved_at,
            repaid_at: loan.repaid_at,
            created_at: loan.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn xof(amount: rust_decimal::Decimal) -> MoneyDto {
        MoneyDto { amount, currency: "XOF".to_string() }
    }

    #[test]
    fn test_transaction_needs_exactly_one_link() {
        let neither = ApplyTransactionRequest {
            amount: xof(dec!(500)),
            payment_id: None,
            loan_id: None,
            description: None,
        };
        assert!(neither.validate().is_err());

        let both = ApplyTransactionRequest {
            payment_id: Some(Uuid::new_v4()),
            loan_id: Some(Uuid::new_v4()),
            ..neither
        };
        assert!(both.validate().is_err());

        let payment = ApplyTransactionRequest { loan_id: None, ..both };
        assert!(payment.validate().is_ok());
        assert!(matches!(payment.link(), Some(TransactionLink::Payment(_))));
    }

    #[test]
    fn test_loan_between_same_fund_rejected() {
        let fund = Uuid::new_v4();
        let request = CreateLoanRequest {
            lender_fund_id: fund,
            borrower_fund_id: fund,
            principal: xof(dec!(1000)),
            due_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_fund_request_validates_code() {
        let request = CreateFundRequest {
            code: String::new(),
            name: "Canteen".to_string(),
            description: None,
            currency: "XOF".to_string(),
            allows_deficit: false,
        };
        assert!(request.validate().is_err());
    }
}
