//! Infrastructure Database Layer
//!
//! This crate persists invoices, payments, funds, the fund ledger and loans
//! in PostgreSQL using SQLx, and provides the services that mutate them
//! atomically.
//!
//! # Architecture
//!
//! - `repositories` map rows to domain types and back; they never decide
//!   anything
//! - `services` open one transaction per operation, lock rows, run the pure
//!   rules from `domain_billing` and `domain_fund`, and commit
//!
//! Postgres is the single source of truth. Invoice status and fund balance
//! are written only by the services in this crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, Reconciler, RecordPayment};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/school_finance")).await?;
//! run_migrations(&pool).await?;
//!
//! let reconciler = Reconciler::new(pool);
//! let payment = reconciler
//!     .record_payment(RecordPayment::new(invoice_id, amount, PaymentMethod::Cash))
//!     .await?;
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod services;

pub use pool::{DatabasePool, create_pool, create_pool_from_url, run_migrations, DatabaseConfig};
pub use error::{DatabaseError, ServiceError};
pub use services::{
    FundLedger, IntegrityAuditor, IntegrityFinding, IntegrityReport, NewLoan, Reconciler, RecordPayment,
};
