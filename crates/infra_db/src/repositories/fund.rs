//! Fund repository implementation
//!
//! This module provides database access for funds and their append-only
//! transaction ledger. `fund_transactions` is insert-only: there is no
//! update or delete method here.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use core_kernel::{FundId, FundLoanId, FundTransactionId, PaymentId};
use domain_fund::{Fund, FundSnapshot, FundTransaction, TransactionLink};

use super::money;
use crate::error::DatabaseError;

const FUND_COLUMNS: &str = r#"
    fund_id, code, name, description, currency, balance_minor,
    allows_deficit, is_active, created_at, updated_at
"#;

const TRANSACTION_COLUMNS: &str = r#"
    transaction_id, fund_id, amount_minor, currency, payment_id, loan_id,
    reverses, description, created_at
"#;

/// Repository for funds and fund transactions
#[derive(Debug, Clone, Copy, Default)]
pub struct FundRepository;

impl FundRepository {
    pub fn new() -> Self {
        Self
    }

    /// Inserts a new fund
    ///
    /// # Errors
    ///
    /// `DuplicateEntry` if the fund code is taken.
    pub async fn insert(&self, conn: &mut PgConnection, fund: &Fund) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO funds (
                fund_id, code, name, description, currency, balance_minor,
                allows_deficit, is_active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(Uuid::from(fund.id))
        .bind(&fund.code)
        .bind(&fund.name)
        .bind(&fund.description)
        .bind(fund.currency.code())
        .bind(fund.balance().minor())
        .bind(fund.allows_deficit)
        .bind(fund.is_active)
        .bind(fund.created_at)
        .bind(fund.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn find(&self, conn: &mut PgConnection, id: FundId) -> Result<Option<Fund>, DatabaseError> {
        let sql = format!("SELECT {FUND_COLUMNS} FROM funds WHERE fund_id = $1");
        let row = sqlx::query_as::<_, FundRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *conn)
            .await?;

        row.map(FundRow::into_fund).transpose()
    }

    /// Loads a fund and locks its row until the transaction ends
    pub async fn find_for_update(
        &self,
        conn: &mut PgConnection,
        id: FundId,
    ) -> Result<Option<Fund>, DatabaseError> {
        let sql = format!("SELECT {FUND_COLUMNS} FROM funds WHERE fund_id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, FundRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *conn)
            .await?;

        row.map(FundRow::into_fund).transpose()
    }

    /// Lists funds ordered by code
    pub async fn list(&self, conn: &mut PgConnection) -> Result<Vec<Fund>, DatabaseError> {
        let sql = format!("SELECT {FUND_COLUMNS} FROM funds ORDER BY code");
        let rows = sqlx::query_as::<_, FundRow>(&sql)
            .fetch_all(&mut *conn)
            .await?;

        rows.into_iter().map(FundRow::into_fund).collect()
    }

    /// Persists the materialized balance and flags
    pub async fn update(&self, conn: &mut PgConnection, fund: &Fund) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE funds
            SET balance_minor = $2, is_active = $3, updated_at = $4
            WHERE fund_id = $1
            "#,
        )
        .bind(Uuid::from(fund.id))
        .bind(fund.balance().minor())
        .bind(fund.is_active)
        .bind(fund.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Fund", fund.id));
        }
        Ok(())
    }

    /// Appends a ledger entry
    ///
    /// # Errors
    ///
    /// `DuplicateEntry` if the entry it reverses already has a reversal.
    pub async fn insert_transaction(
        &self,
        conn: &mut PgConnection,
        txn: &FundTransaction,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO fund_transactions (
                transaction_id, fund_id, amount_minor, currency, payment_id, loan_id,
                reverses, description, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::from(txn.id))
        .bind(Uuid::from(txn.fund_id))
        .bind(txn.amount.minor())
        .bind(txn.amount.currency().code())
        .bind(txn.link.payment_id().map(Uuid::from))
        .bind(txn.link.loan_id().map(Uuid::from))
        .bind(txn.reverses.map(Uuid::from))
        .bind(&txn.description)
        .bind(txn.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn find_transaction(
        &self,
        conn: &mut PgConnection,
        id: FundTransactionId,
    ) -> Result<Option<FundTransaction>, DatabaseError> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM fund_transactions WHERE transaction_id = $1");
        let row = sqlx::query_as::<_, FundTransactionRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *conn)
            .await?;

        row.map(FundTransactionRow::into_transaction).transpose()
    }

    /// Returns true if a reversal of `id` exists
    pub async fn is_reversed(&self, conn: &mut PgConnection, id: FundTransactionId) -> Result<bool, DatabaseError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM fund_transactions WHERE reverses = $1)",
        )
        .bind(Uuid::from(id))
        .fetch_one(&mut *conn)
        .await?;

        Ok(exists)
    }

    /// Returns the original (non-reversal) entry posted for a payment
    pub async fn transaction_for_payment(
        &self,
        conn: &mut PgConnection,
        payment_id: PaymentId,
    ) -> Result<Option<FundTransaction>, DatabaseError> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM fund_transactions
             WHERE payment_id = $1
               AND reverses IS NULL
               AND fund_id = (SELECT fund_id FROM payments WHERE payment_id = $1)
             ORDER BY created_at
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, FundTransactionRow>(&sql)
            .bind(Uuid::from(payment_id))
            .fetch_optional(&mut *conn)
            .await?;

        row.map(FundTransactionRow::into_transaction).transpose()
    }

    /// Returns a fund's full ledger, oldest first
    pub async fn transactions(
        &self,
        conn: &mut PgConnection,
        fund_id: FundId,
    ) -> Result<Vec<FundTransaction>, DatabaseError> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM fund_transactions
             WHERE fund_id = $1
             ORDER BY created_at, transaction_id"
        );
        let rows = sqlx::query_as::<_, FundTransactionRow>(&sql)
            .bind(Uuid::from(fund_id))
            .fetch_all(&mut *conn)
            .await?;

        rows.into_iter().map(FundTransactionRow::into_transaction).collect()
    }
}

/// Database row for a fund
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FundRow {
    pub fund_id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub currency: String,
    pub balance_minor: i64,
    pub allows_deficit: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FundRow {
    fn into_fund(self) -> Result<Fund, DatabaseError> {
        let balance = money(self.balance_minor, &self.currency)?;
        Ok(Fund::from(FundSnapshot {
            id: FundId::from_uuid(self.fund_id),
            code: self.code,
            name: self.name,
            description: self.description,
            currency: balance.currency(),
            balance,
            allows_deficit: self.allows_deficit,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }))
    }
}

/// Database row for a fund transaction
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FundTransactionRow {
    pub transaction_id: Uuid,
    pub fund_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub payment_id: Option<Uuid>,
    pub loan_id: Option<Uuid>,
    pub reverses: Option<Uuid>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FundTransactionRow {
    fn into_transaction(self) -> Result<FundTransaction, DatabaseError> {
        let link = match (self.payment_id, self.loan_id) {
            (Some(payment), None) => TransactionLink::Payment(PaymentId::from_uuid(payment)),
            (None, Some(loan)) => TransactionLink::Loan(FundLoanId::from_uuid(loan)),
            _ => {
                return Err(DatabaseError::CorruptRow(format!(
                    "fund transaction {} must link exactly one payment or loan",
                    self.transaction_id
                )))
            }
        };

        Ok(FundTransaction {
            id: FundTransactionId::from_uuid(self.transaction_id),
            fund_id: FundId::from_uuid(self.fund_id),
            amount: money(self.amount_minor, &self.currency)?,
            link,
            reverses: self.reverses.map(FundTransactionId::from_uuid),
            description: self.description,
            created_at: self.created_at,
        })
    }
}
