//! Fund loan repository implementation

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use core_kernel::{FundId, FundLoanId};
use domain_fund::{FundLoan, LoanStatus};

use super::money;
use crate::error::DatabaseError;

const LOAN_COLUMNS: &str = r#"
    loan_id, lender_fund_id, borrower_fund_id, principal_minor, currency,
    status, due_date, approved_at, repaid_at, created_at, updated_at
"#;

/// Repository for inter-fund loans
#[derive(Debug, Clone, Copy, Default)]
pub struct LoanRepository;

impl LoanRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert(&self, conn: &mut PgConnection, loan: &FundLoan) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO fund_loans (
                loan_id, lender_fund_id, borrower_fund_id, principal_minor, currency,
                status, due_date, approved_at, repaid_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(Uuid::from(loan.id))
        .bind(Uuid::from(loan.lender_fund_id))
        .bind(Uuid::from(loan.borrower_fund_id))
        .bind(loan.principal.minor())
        .bind(loan.principal.currency().code())
        .bind(PgLoanStatus::from(loan.status))
        .bind(loan.due_date)
        .bind(loan.approved_at)
        .bind(loan.repaid_at)
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn find(&self, conn: &mut PgConnection, id: FundLoanId) -> Result<Option<FundLoan>, DatabaseError> {
        let sql = format!("SELECT {LOAN_COLUMNS} FROM fund_loans WHERE loan_id = $1");
        let row = sqlx::query_as::<_, LoanRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *conn)
            .await?;

        row.map(LoanRow::into_loan).transpose()
    }

    /// Loads a loan and locks its row until the transaction ends
    pub async fn find_for_update(
        &self,
        conn: &mut PgConnection,
        id: FundLoanId,
    ) -> Result<Option<FundLoan>, DatabaseError> {
        let sql = format!("SELECT {LOAN_COLUMNS} FROM fund_loans WHERE loan_id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, LoanRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *conn)
            .await?;

        row.map(LoanRow::into_loan).transpose()
    }

    /// Locks every approved loan whose due date is before `today`
    pub async fn approved_due_before(
        &self,
        conn: &mut PgConnection,
        today: NaiveDate,
    ) -> Result<Vec<FundLoan>, DatabaseError> {
        let sql = format!(
            "SELECT {LOAN_COLUMNS} FROM fund_loans
             WHERE status = 'APPROVED' AND due_date < $1
             ORDER BY loan_id
             FOR UPDATE"
        );
        let rows = sqlx::query_as::<_, LoanRow>(&sql)
            .bind(today)
            .fetch_all(&mut *conn)
            .await?;

        rows.into_iter().map(LoanRow::into_loan).collect()
    }

    /// Lists loans, newest first
    pub async fn list(&self, conn: &mut PgConnection) -> Result<Vec<FundLoan>, DatabaseError> {
        let sql = format!("SELECT {LOAN_COLUMNS} FROM fund_loans ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, LoanRow>(&sql)
            .fetch_all(&mut *conn)
            .await?;

        rows.into_iter().map(LoanRow::into_loan).collect()
    }

    pub async fn update(&self, conn: &mut PgConnection, loan: &FundLoan) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE fund_loans
            SET status = $2, approved_at = $3, repaid_at = $4, updated_at = $5
            WHERE loan_id = $1
            "#,
        )
        .bind(Uuid::from(loan.id))
        .bind(PgLoanStatus::from(loan.status))
        .bind(loan.approved_at)
        .bind(loan.repaid_at)
        .bind(loan.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Loan", loan.id));
        }
        Ok(())
    }
}

/// Loan status column
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "loan_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PgLoanStatus {
    Pending,
    Approved,
    Repaid,
    Overdue,
}

impl From<LoanStatus> for PgLoanStatus {
    fn from(value: LoanStatus) -> Self {
        match value {
            LoanStatus::Pending => PgLoanStatus::Pending,
            LoanStatus::Approved => PgLoanStatus::Approved,
            LoanStatus::Repaid => PgLoanStatus::Repaid,
            LoanStatus::Overdue => PgLoanStatus::Overdue,
        }
    }
}

impl From<PgLoanStatus> for LoanStatus {
    fn from(value: PgLoanStatus) -> Self {
        match value {
            PgLoanStatus::Pending => LoanStatus::Pending,
            PgLoanStatus::Approved => LoanStatus::Approved,
            PgLoanStatus::Repaid => LoanStatus::Repaid,
            PgLoanStatus::Overdue => LoanStatus::Overdue,
        }
    }
}

/// Database row for a fund loan
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LoanRow {
    pub loan_id: Uuid,
    pub lender_fund_id: Uuid,
    pub borrower_fund_id: Uuid,
    pub principal_minor: i64,
    pub currency: String,
    pub status: PgLoanStatus,
    pub due_date: NaiveDate,
    pub approved_at: Option<DateTime<Utc>>,
    pub repaid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanRow {
    fn into_loan(self) -> Result<FundLoan, DatabaseError> {
        Ok(FundLoan {
            id: FundLoanId::from_uuid(self.loan_id),
            lender_fund_id: FundId::from_uuid(self.lender_fund_id),
            borrower_fund_id: FundId::from_uuid(self.borrower_fund_id),
            principal: money(self.principal_minor, &self.currency)?,
            status: self.status.into(),
            due_date: self.due_date,
            approved_at: self.approved_at,
            repaid_at: self.repaid_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
