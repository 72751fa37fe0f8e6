//! Invoice repository implementation
//!
//! Invoices are stored in `invoices` with their line items in
//! `invoice_items`. The status column is only written from an `Invoice` that
//! has just been reconciled or cancelled in memory.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use core_kernel::{InvoiceId, LineItemId, StudentId};
use domain_billing::{Cancellation, Invoice, InvoiceItem, InvoiceSnapshot, InvoiceStatus, InvoiceType};

use super::money;
use crate::error::DatabaseError;

const INVOICE_COLUMNS: &str = r#"
    invoice_id, invoice_number, invoice_type, student_id, counterparty,
    currency, total_minor, status, due_date,
    cancel_reason, cancelled_by, cancelled_at, created_at, updated_at
"#;

/// Repository for invoices and their line items
#[derive(Debug, Clone, Copy, Default)]
pub struct InvoiceRepository;

impl InvoiceRepository {
    pub fn new() -> Self {
        Self
    }

    /// Inserts an invoice and all of its line items
    ///
    /// # Errors
    ///
    /// `DuplicateEntry` if the invoice number is taken.
    pub async fn insert(&self, conn: &mut PgConnection, invoice: &Invoice) -> Result<(), DatabaseError> {
        let cancellation = invoice.cancellation();

        sqlx::query(
            r#"
            INSERT INTO invoices (
                invoice_id, invoice_number, invoice_type, student_id, counterparty,
                currency, total_minor, status, due_date,
                cancel_reason, cancelled_by, cancelled_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(Uuid::from(invoice.id))
        .bind(&invoice.invoice_number)
        .bind(PgInvoiceType::from(invoice.invoice_type))
        .bind(invoice.student_id.map(Uuid::from))
        .bind(&invoice.counterparty)
        .bind(invoice.currency.code())
        .bind(invoice.total().minor())
        .bind(PgInvoiceStatus::from(invoice.status()))
        .bind(invoice.due_date)
        .bind(cancellation.map(|c| c.reason.clone()))
        .bind(cancellation.map(|c| c.actor.clone()))
        .bind(cancellation.map(|c| c.cancelled_at))
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *conn)
        .await?;

        for (position, item) in invoice.items().iter().enumerate() {
            let quantity = i32::try_from(item.quantity).map_err(|_| {
                DatabaseError::ConstraintViolation(format!("quantity {} out of range", item.quantity))
            })?;

            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    item_id, invoice_id, position, description, quantity, unit_price_minor
                ) VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::from(item.id))
            .bind(Uuid::from(invoice.id))
            .bind(position as i32)
            .bind(&item.description)
            .bind(quantity)
            .bind(item.unit_price.minor())
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Loads an invoice with its items
    pub async fn find(
        &self,
        conn: &mut PgConnection,
        id: InvoiceId,
    ) -> Result<Option<Invoice>, DatabaseError> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1");
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(conn, row).await?)),
            None => Ok(None),
        }
    }

    /// Loads an invoice and locks its row until the transaction ends
    ///
    /// Every write to an invoice's payments or status starts here, which
    /// serializes concurrent operations on the same invoice.
    pub async fn find_for_update(
        &self,
        conn: &mut PgConnection,
        id: InvoiceId,
    ) -> Result<Option<Invoice>, DatabaseError> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(conn, row).await?)),
            None => Ok(None),
        }
    }

    /// Lists invoices, newest first, optionally filtered by status
    pub async fn list(
        &self,
        conn: &mut PgConnection,
        status: Option<InvoiceStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Invoice>, DatabaseError> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices
             WHERE ($1::invoice_status IS NULL OR status = $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(status.map(PgInvoiceStatus::from))
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *conn)
            .await?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            invoices.push(self.hydrate(conn, row).await?);
        }
        Ok(invoices)
    }

    /// Returns every invoice id, oldest first
    pub async fn list_ids(&self, conn: &mut PgConnection) -> Result<Vec<InvoiceId>, DatabaseError> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT invoice_id FROM invoices ORDER BY created_at")
            .fetch_all(&mut *conn)
            .await?;
        Ok(ids.into_iter().map(InvoiceId::from_uuid).collect())
    }

    /// Persists the status and cancellation record
    ///
    /// Items and totals are immutable once stored.
    pub async fn update_status(&self, conn: &mut PgConnection, invoice: &Invoice) -> Result<(), DatabaseError> {
        let cancellation = invoice.cancellation();

        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET status = $2, cancel_reason = $3, cancelled_by = $4, cancelled_at = $5, updated_at = $6
            WHERE invoice_id = $1
            "#,
        )
        .bind(Uuid::from(invoice.id))
        .bind(PgInvoiceStatus::from(invoice.status()))
        .bind(cancellation.map(|c| c.reason.clone()))
        .bind(cancellation.map(|c| c.actor.clone()))
        .bind(cancellation.map(|c| c.cancelled_at))
        .bind(invoice.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Invoice", invoice.id));
        }
        Ok(())
    }

    async fn hydrate(&self, conn: &mut PgConnection, row: InvoiceRow) -> Result<Invoice, DatabaseError> {
        let items = sqlx::query_as::<_, InvoiceItemRow>(
            r#"
            SELECT item_id, description, quantity, unit_price_minor
            FROM invoice_items
            WHERE invoice_id = $1
            ORDER BY position
            "#,
        )
        .bind(row.invoice_id)
        .fetch_all(&mut *conn)
        .await?;

        row.into_invoice(items)
    }
}

/// Invoice type column
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "invoice_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PgInvoiceType {
    Outgoing,
    Incoming,
}

impl From<InvoiceType> for PgInvoiceType {
    fn from(value: InvoiceType) -> Self {
        match value {
            InvoiceType::Outgoing => PgInvoiceType::Outgoing,
            InvoiceType::Incoming => PgInvoiceType::Incoming,
        }
    }
}

impl From<PgInvoiceType> for InvoiceType {
    fn from(value: PgInvoiceType) -> Self {
        match value {
            PgInvoiceType::Outgoing => InvoiceType::Outgoing,
            PgInvoiceType::Incoming => InvoiceType::Incoming,
        }
    }
}

/// Invoice status column
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PgInvoiceStatus {
    Pending,
    Partial,
    Paid,
    Cancelled,
}

impl From<InvoiceStatus> for PgInvoiceStatus {
    fn from(value: InvoiceStatus) -> Self {
        match value {
            InvoiceStatus::Pending => PgInvoiceStatus::Pending,
            InvoiceStatus::Partial => PgInvoiceStatus::Partial,
            InvoiceStatus::Paid => PgInvoiceStatus::Paid,
            InvoiceStatus::Cancelled => PgInvoiceStatus::Cancelled,
        }
    }
}

impl From<PgInvoiceStatus> for InvoiceStatus {
    fn from(value: PgInvoiceStatus) -> Self {
        match value {
            PgInvoiceStatus::Pending => InvoiceStatus::Pending,
            PgInvoiceStatus::Partial => InvoiceStatus::Partial,
            PgInvoiceStatus::Paid => InvoiceStatus::Paid,
            PgInvoiceStatus::Cancelled => InvoiceStatus::Cancelled,
        }
    }
}

/// Database row for an invoice
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvoiceRow {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub invoice_type: PgInvoiceType,
    pub student_id: Option<Uuid>,
    pub counterparty: Option<String>,
    pub currency: String,
    pub total_minor: i64,
    pub status: PgInvoiceStatus,
    pub due_date: NaiveDate,
    pub cancel_reason: Option<String>,
    pub cancelled_by: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for an invoice line item
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvoiceItemRow {
    pub item_id: Uuid,
    pub description: String,
    pub quantity: i32,
    pub unit_price_minor: i64,
}

impl InvoiceRow {
    fn into_invoice(self, items: Vec<InvoiceItemRow>) -> Result<Invoice, DatabaseError> {
        let total = money(self.total_minor, &self.currency)?;

        let items = items
            .into_iter()
            .map(|item| {
                let quantity = u32::try_from(item.quantity).map_err(|_| {
                    DatabaseError::CorruptRow(format!("item {} has quantity {}", item.item_id, item.quantity))
                })?;
                Ok(InvoiceItem {
                    id: LineItemId::from_uuid(item.item_id),
                    description: item.description,
                    quantity,
                    unit_price: money(item.unit_price_minor, &self.currency)?,
                })
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        let cancellation = match (self.cancel_reason, self.cancelled_by, self.cancelled_at) {
            (Some(reason), Some(actor), Some(cancelled_at)) => Some(Cancellation {
                reason,
                actor,
                cancelled_at,
            }),
            _ => None,
        };

        Ok(Invoice::from(InvoiceSnapshot {
            id: InvoiceId::from_uuid(self.invoice_id),
            invoice_number: self.invoice_number,
            invoice_type: self.invoice_type.into(),
            student_id: self.student_id.map(StudentId::from_uuid),
            counterparty: self.counterparty,
            currency: total.currency(),
            items,
            total,
            status: self.status.into(),
            due_date: self.due_date,
            cancellation,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }))
    }
}
