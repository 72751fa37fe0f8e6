//! Fund definition
//!
//! This module defines the Fund entity. Its balance is only ever changed by
//! the ledger (see [`crate::ledger`]), which appends a transaction for every
//! change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, FundId, Money};

/// An internal school fund (e.g. "Canteen", "Library", "Building loan pool")
///
/// Serialize-only; rebuilding goes through [`FundSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct Fund {
    /// Unique identifier
    pub id: FundId,
    /// Fund code (short identifier)
    pub code: String,
    /// Fund name
    pub name: String,
    /// Fund description
    pub description: Option<String>,
    /// Currency of the balance and every transaction
    pub currency: Currency,
    pub(crate) balance: Money,
    /// Whether the balance may go below zero
    pub allows_deficit: bool,
    /// Whether fund accepts new transactions
    pub is_active: bool,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Fund {
    /// Creates a new active fund with a zero balance
    ///
    /// # Arguments
    ///
    /// * `code` - Short fund identifier
    /// * `name` - Fund name
    /// * `currency` - Fund currency
    pub fn new(code: impl Into<String>, name: impl Into<String>, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: FundId::new_v7(),
            code: code.into(),
            name: name.into(),
            description: None,
            currency,
            balance: Money::zero(currency),
            allows_deficit: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Lets the balance go negative (borrowing funds)
    pub fn allowing_deficit(mut self) -> Self {
        self.allows_deficit = true;
        self
    }

    /// Returns the materialized balance
    pub fn balance(&self) -> Money {
        self.balance
    }

    /// Closes the fund to new transactions; reversals stay possible
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}

/// Persisted form of a fund, used to rebuild it from storage
#[derive(Debug, Clone, Deserialize)]
pub struct FundSnapshot {
    pub id: FundId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub currency: Currency,
    pub balance: Money,
    pub allows_deficit: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FundSnapshot> for Fund {
    fn from(s: FundSnapshot) -> Self {
        Self {
            id: s.id,
            code: s.code,
            name: s.name,
            description: s.description,
            currency: s.currency,
            balance: s.balance,
            allows_deficit: s.allows_deficit,
            is_active: s.is_active,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}
