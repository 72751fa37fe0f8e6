//! Fund ledger service
//!
//! Owns every write to `funds.balance_minor` and `fund_transactions`. The
//! reconciler posts payment effects through the crate-internal `post` and
//! `reverse_entry` helpers so that they share the same locking and rules.

use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};
use tracing::info;

use core_kernel::{FundId, FundLoanId, FundTransactionId, Money};
use domain_fund::{ledger, Fund, FundError, FundLoan, FundTransaction, LoanMovement, TransactionLink};

use crate::error::ServiceError;
use crate::repositories::{FundRepository, LoanRepository};

/// Request to create a loan between two funds
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub lender_fund_id: FundId,
    pub borrower_fund_id: FundId,
    pub principal: Money,
    pub due_date: NaiveDate,
}

/// Service for fund balances, the fund ledger, and inter-fund loans
#[derive(Debug, Clone)]
pub struct FundLedger {
    pool: PgPool,
    funds: FundRepository,
    loans: LoanRepository,
}

impl FundLedger {
    /// Creates a new FundLedger with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            funds: FundRepository::new(),
            loans: LoanRepository::new(),
        }
    }

    /// Stores a new fund
    ///
    /// Funds start with a zero balance; money only arrives through the
    /// ledger.
    pub async fn create_fund(&self, fund: Fund) -> Result<Fund, ServiceError> {
        if !fund.balance().is_zero() {
            return Err(FundError::InvalidAmount("a new fund must start at zero".to_string()).into());
        }

        let mut conn = self.pool.acquire().await?;
        self.funds.insert(&mut conn, &fund).await?;

        info!(fund_id = %fund.id, code = %fund.code, currency = %fund.currency, "Fund created");
        Ok(fund)
    }

    pub async fn get_fund(&self, fund_id: FundId) -> Result<Fund, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        self.funds
            .find(&mut conn, fund_id)
            .await?
            .ok_or_else(|| FundError::FundNotFound(fund_id).into())
    }

    pub async fn list_funds(&self) -> Result<Vec<Fund>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(self.funds.list(&mut conn).await?)
    }

    /// Closes a fund to new transactions
    pub async fn deactivate_fund(&self, fund_id: FundId) -> Result<Fund, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let mut fund = self.lock_fund(&mut tx, fund_id).await?;
        fund.deactivate();
        self.funds.update(&mut tx, &fund).await?;
        tx.commit().await?;

        info!(fund_id = %fund_id, "Fund deactivated");
        Ok(fund)
    }

    /// Returns a fund's ledger, oldest first
    pub async fn list_transactions(&self, fund_id: FundId) -> Result<Vec<FundTransaction>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        if self.funds.find(&mut conn, fund_id).await?.is_none() {
            return Err(FundError::FundNotFound(fund_id).into());
        }
        Ok(self.funds.transactions(&mut conn, fund_id).await?)
    }

    /// Applies a signed amount to a fund
    ///
    /// # Errors
    ///
    /// - `FundNotFound`, `FundInactive`
    /// - `InvalidAmount` for zero or a foreign currency
    /// - `InsufficientFunds` if a non-deficit fund would go negative
    pub async fn apply_transaction(
        &self,
        fund_id: FundId,
        amount: Money,
        link: TransactionLink,
        description: Option<String>,
    ) -> Result<FundTransaction, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let txn = self.post(&mut tx, fund_id, amount, link, description).await?;
        tx.commit().await?;

        info!(
            fund_id = %fund_id,
            transaction_id = %txn.id,
            amount = %txn.amount,
            "Fund transaction applied"
        );
        Ok(txn)
    }

    /// Appends the reversal of an existing entry
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound`
    /// - `SettlementEntry` for an entry posted by a payment or a loan
    /// - `AlreadyReversed`, `ReversalOfReversal`
    /// - `InsufficientFunds` if the reversal would overdraw the fund
    pub async fn reverse_transaction(
        &self,
        transaction_id: FundTransactionId,
    ) -> Result<FundTransaction, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let original = self
            .funds
            .find_transaction(&mut tx, transaction_id)
            .await?
            .ok_or(FundError::TransactionNotFound(transaction_id))?;

        let settles_payment = match original.link {
            TransactionLink::Payment(payment_id) => self
                .funds
                .transaction_for_payment(&mut tx, payment_id)
                .await?
                .is_some_and(|settlement| settlement.id == original.id),
            TransactionLink::Loan(_) => false,
        };
        ledger::ensure_standalone_reversal(&original, settles_payment)?;

        let reversal = self.reverse_entry(&mut tx, &original).await?;
        tx.commit().await?;

        info!(
            fund_id = %reversal.fund_id,
            transaction_id = %transaction_id,
            reversal_id = %reversal.id,
            "Fund transaction reversed"
        );
        Ok(reversal)
    }

    /// Creates a pending loan between two existing funds of the same currency
    pub async fn create_loan(&self, request: NewLoan) -> Result<FundLoan, ServiceError> {
        let loan = FundLoan::new(
            request.lender_fund_id,
            request.borrower_fund_id,
            request.principal,
            request.due_date,
        )?;

        let mut conn = self.pool.acquire().await?;
        for fund_id in [loan.lender_fund_id, loan.borrower_fund_id] {
            let fund = self
                .funds
                .find(&mut conn, fund_id)
                .await?
                .ok_or(FundError::FundNotFound(fund_id))?;
            if fund.currency != loan.principal.currency() {
                return Err(FundError::InvalidLoan(format!(
                    "fund {} holds {}, loan is in {}",
                    fund.id,
                    fund.currency,
                    loan.principal.currency()
                ))
                .into());
            }
        }
        self.loans.insert(&mut conn, &loan).await?;

        info!(
            loan_id = %loan.id,
            lender = %loan.lender_fund_id,
            borrower = %loan.borrower_fund_id,
            principal = %loan.principal,
            "Fund loan created"
        );
        Ok(loan)
    }

    pub async fn get_loan(&self, loan_id: FundLoanId) -> Result<FundLoan, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        self.loans
            .find(&mut conn, loan_id)
            .await?
            .ok_or_else(|| FundError::LoanNotFound(loan_id).into())
    }

    pub async fn list_loans(&self) -> Result<Vec<FundLoan>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(self.loans.list(&mut conn).await?)
    }

    /// Approves a pending loan, moving the principal to the borrower
    pub async fn approve_loan(&self, loan_id: FundLoanId) -> Result<FundLoan, ServiceError> {
        self.transition_loan(loan_id, FundLoan::approve, "Fund loan approved").await
    }

    /// Repays an approved or overdue loan, moving the principal back
    pub async fn repay_loan(&self, loan_id: FundLoanId) -> Result<FundLoan, ServiceError> {
        self.transition_loan(loan_id, FundLoan::repay, "Fund loan repaid").await
    }

    /// Flags every approved loan past its due date as overdue
    ///
    /// Returns the loans that changed.
    pub async fn mark_overdue_loans(&self, today: NaiveDate) -> Result<Vec<FundLoan>, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let mut changed = Vec::new();

        for mut loan in self.loans.approved_due_before(&mut tx, today).await? {
            if loan.mark_overdue(today) {
                self.loans.update(&mut tx, &loan).await?;
                changed.push(loan);
            }
        }
        tx.commit().await?;

        if !changed.is_empty() {
            tracing::warn!(count = changed.len(), as_of = %today, "Fund loans marked overdue");
        }
        Ok(changed)
    }

    async fn transition_loan(
        &self,
        loan_id: FundLoanId,
        transition: fn(&mut FundLoan) -> Result<[LoanMovement; 2], FundError>,
        message: &'static str,
    ) -> Result<FundLoan, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let mut loan = self
            .loans
            .find_for_update(&mut tx, loan_id)
            .await?
            .ok_or(FundError::LoanNotFound(loan_id))?;

        let mut funds = self
            .lock_funds(&mut tx, &[loan.lender_fund_id, loan.borrower_fund_id])
            .await?;
        let movements = transition(&mut loan)?;

        let mut entries = Vec::with_capacity(movements.len());
        for movement in movements {
            let fund = funds
                .iter_mut()
                .find(|f| f.id == movement.fund_id)
                .ok_or(FundError::FundNotFound(movement.fund_id))?;
            entries.push(ledger::apply(
                fund,
                movement.amount,
                TransactionLink::Loan(loan.id),
                Some(format!("{} {}", message, loan.id)),
            )?);
        }

        self.loans.update(&mut tx, &loan).await?;
        for fund in &funds {
            self.funds.update(&mut tx, fund).await?;
        }
        for entry in &entries {
            self.funds.insert_transaction(&mut tx, entry).await?;
        }
        tx.commit().await?;

        info!(
            loan_id = %loan.id,
            status = %loan.status,
            principal = %loan.principal,
            "{}", message
        );
        Ok(loan)
    }

    /// Posts one signed amount inside the caller's transaction
    pub(crate) async fn post(
        &self,
        conn: &mut PgConnection,
        fund_id: FundId,
        amount: Money,
        link: TransactionLink,
        description: Option<String>,
    ) -> Result<FundTransaction, ServiceError> {
        let mut fund = self.lock_fund(conn, fund_id).await?;
        let txn = ledger::apply(&mut fund, amount, link, description)?;

        self.funds.update(conn, &fund).await?;
        self.funds.insert_transaction(conn, &txn).await?;
        Ok(txn)
    }

    /// Reverses one entry inside the caller's transaction
    pub(crate) async fn reverse_entry(
        &self,
        conn: &mut PgConnection,
        original: &FundTransaction,
    ) -> Result<FundTransaction, ServiceError> {
        let mut fund = self.lock_fund(conn, original.fund_id).await?;
        // Checked after the fund lock so a concurrent reversal is visible.
        let already_reversed = self.funds.is_reversed(conn, original.id).await?;
        let reversal = ledger::reverse(&mut fund, original, already_reversed)?;

        self.funds.update(conn, &fund).await?;
        self.funds.insert_transaction(conn, &reversal).await?;
        Ok(reversal)
    }

    async fn lock_fund(&self, conn: &mut PgConnection, fund_id: FundId) -> Result<Fund, ServiceError> {
        self.funds
            .find_for_update(conn, fund_id)
            .await?
            .ok_or_else(|| FundError::FundNotFound(fund_id).into())
    }

    async fn lock_funds(&self, conn: &mut PgConnection, ids: &[FundId]) -> Result<Vec<Fund>, ServiceError> {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut funds = Vec::with_capacity(ids.len());
        for id in ids {
            funds.push(self.lock_fund(conn, id).await?);
        }
        Ok(funds)
    }
}
