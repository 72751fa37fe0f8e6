//! Database Test Utilities
//!
//! Provides a PostgreSQL database with the workspace migrations applied,
//! and a shared instance for integration tests. Tests that use it need
//! either a running Docker daemon or `DATABASE_URL` pointing at a server
//! where the user may create databases.

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, PgConnection, PgPool};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::testcontainers::{ContainerAsync, ImageExt};
use tokio::sync::OnceCell;

const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "school_finance_test";

/// Points the harness at an existing server instead of a container
pub const EXTERNAL_URL_VAR: &str = "DATABASE_URL";

/// Configuration for test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    /// Creates the database connection URL
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A migrated PostgreSQL database for one test run
///
/// Backed by a testcontainer, or by a fresh database created on the server
/// named in `DATABASE_URL` when that variable is set.
pub struct TestDatabase {
    _container: Option<ContainerAsync<Postgres>>,
    pub options: PgConnectOptions,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Creates a migrated database
    ///
    /// With `DATABASE_URL` set, a uniquely named database is created on that
    /// server so tests stay isolated without Docker. Otherwise a new
    /// container is started.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or a migration fails
    pub async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        match std::env::var(EXTERNAL_URL_VAR) {
            Ok(url) if !url.trim().is_empty() => Self::on_server(&url).await,
            _ => Self::in_container().await,
        }
    }

    async fn in_container() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let container = Postgres::default()
            .with_db_name(POSTGRES_DB)
            .with_user(POSTGRES_USER)
            .with_password(POSTGRES_PASSWORD)
            .with_tag(POSTGRES_TAG)
            .start()
            .await?;

        let port = container.get_host_port_ipv4(5432).await?;
        let host = container.get_host().await?.to_string();

        let config = TestDatabaseConfig {
            host,
            port,
            ..TestDatabaseConfig::default()
        };
        let options = PgConnectOptions::from_str(&config.connection_url())?;
        let pool = connect_and_migrate(options.clone()).await?;

        Ok(Self {
            _container: Some(container),
            options,
            pool,
        })
    }

    async fn on_server(url: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let server = PgConnectOptions::from_str(url)?;
        let name = unique_database_name();

        let mut admin = PgConnection::connect_with(&server).await?;
        sqlx::query(&format!("CREATE DATABASE \"{name}\""))
            .execute(&mut admin)
            .await?;
        admin.close().await?;

        let options = server.database(&name);
        let pool = connect_and_migrate(options.clone()).await?;

        Ok(Self {
            _container: None,
            options,
            pool,
        })
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Clears all data from the database while preserving the schema
    ///
    /// Useful for resetting state between tests
    pub async fn clear_data(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            "TRUNCATE TABLE fund_transactions, fund_loans, payments, invoice_items, invoices, funds CASCADE",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Global test database for shared integration tests
static SHARED_TEST_DB: OnceCell<Arc<TestDatabase>> = OnceCell::const_new();

/// Gets or creates a shared test database instance
///
/// Tests sharing it must not assume an empty database; use unique fund
/// codes and work only with rows they created.
///
/// # Panics
///
/// Panics if the database fails to initialize
pub async fn get_shared_test_database() -> Arc<TestDatabase> {
    SHARED_TEST_DB
        .get_or_init(|| async {
            Arc::new(
                TestDatabase::new()
                    .await
                    .expect("Failed to create shared test database"),
            )
        })
        .await
        .clone()
}

/// Creates an isolated test database for a single test
pub async fn create_isolated_test_database() -> Result<TestDatabase, Box<dyn std::error::Error + Send + Sync>> {
    TestDatabase::new().await
}

/// Runs a test body against a fresh, migrated database
///
/// The body sees `pool: &PgPool`. Ignored by default since it needs Docker
/// or `DATABASE_URL`.
#[macro_export]
macro_rules! db_test {
    ($name:ident, $body:expr) => {
        #[tokio::test]
        #[ignore = "requires Docker or DATABASE_URL"]
        async fn $name() {
            let db = $crate::database::create_isolated_test_database()
                .await
                .expect("Failed to create test database");
            let pool = db.pool();
            $body
        }
    };
}

async fn connect_and_migrate(options: PgConnectOptions) -> Result<PgPool, Box<dyn std::error::Error + Send + Sync>> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await?;

    infra_db::run_migrations(&pool).await?;
    Ok(pool)
}

/// Name for a throwaway database on an external server
fn unique_database_name() -> String {
    format!("{}_{}", POSTGRES_DB, uuid::Uuid::new_v4().simple())
}

/// Sums a fund's ledger rows directly in SQL, bypassing the repositories
pub async fn ledger_sum_minor(pool: &PgPool, fund_id: uuid::Uuid) -> Result<i64, sqlx::Error> {
    let (sum,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(amount_minor), 0)::BIGINT FROM fund_transactions WHERE fund_id = $1",
    )
    .bind(fund_id)
    .fetch_one(pool)
    .await?;
    Ok(sum)
}

/// Counts rows in a table
pub async fn count_rows(pool: &PgPool, table: &str) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_connection_url() {
        let config = TestDatabaseConfig::default();
        let url = config.connection_url();

        assert!(url.starts_with("postgres://"));
        assert!(url.contains(POSTGRES_USER));
        assert!(url.contains(POSTGRES_DB));
    }

    #[test]
    fn test_unique_database_names_differ() {
        let a = unique_database_name();
        let b = unique_database_name();

        assert_ne!(a, b);
        assert!(a.starts_with(POSTGRES_DB));
        assert!(a.len() < 64);
    }
}
