//! Invoice management
//!
//! This module handles invoices billed to students (outgoing) and invoices
//! received from suppliers (incoming). Totals are always derived from the
//! line items and status is always derived from payments, so neither field
//! has a public setter.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{Currency, InvoiceId, LineItemId, Money, StudentId};

use crate::error::{BillingError, IntegrityViolation};
use crate::payment::Payment;
use crate::reconciliation;

/// Direction of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceType {
    /// Billed to a student; payments are money coming in
    Outgoing,
    /// Billed by a supplier; payments are money going out
    Incoming,
}

/// Invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// No completed payment yet
    Pending,
    /// Partially covered by completed payments
    Partial,
    /// Completed payments equal the total
    Paid,
    /// Cancelled; terminal
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::Partial => "PARTIAL",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Cancelled => "CANCELLED",
        }
    }

    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Cancelled)
    }

    /// Returns true if the invoice may still be cancelled
    pub fn is_cancellable(&self) -> bool {
        matches!(self, InvoiceStatus::Pending | InvoiceStatus::Partial)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who cancelled an invoice, when, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub reason: String,
    pub actor: String,
    pub cancelled_at: DateTime<Utc>,
}

/// A billing record for a student or from a supplier
///
/// Serialize-only; rebuilding goes through [`InvoiceSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// Invoice number (human-readable)
    pub invoice_number: String,
    /// Outgoing (student) or incoming (supplier)
    pub invoice_type: InvoiceType,
    /// Student being billed, absent for supplier invoices
    pub student_id: Option<StudentId>,
    /// Supplier or other external party
    pub counterparty: Option<String>,
    /// Currency
    pub currency: Currency,
    items: Vec<InvoiceItem>,
    total: Money,
    status: InvoiceStatus,
    /// Due date
    pub due_date: NaiveDate,
    cancellation: Option<Cancellation>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates a new, empty, pending invoice
    ///
    /// # Arguments
    ///
    /// * `invoice_type` - Outgoing (student) or incoming (supplier)
    /// * `currency` - Invoice currency; every item and payment must match it
    /// * `due_date` - Payment due date
    pub fn new(invoice_type: InvoiceType, currency: Currency, due_date: NaiveDate) -> Self {
        let now = Utc::now();
        let id = InvoiceId::new_v7();

        Self {
            id,
            invoice_number: generate_invoice_number(&id),
            invoice_type,
            student_id: None,
            counterparty: None,
            currency,
            items: Vec::new(),
            total: Money::zero(currency),
            status: InvoiceStatus::Pending,
            due_date,
            cancellation: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the billed student
    pub fn for_student(mut self, student_id: StudentId) -> Self {
        self.student_id = Some(student_id);
        self
    }

    /// Sets the supplier or external party
    pub fn with_counterparty(mut self, counterparty: impl Into<String>) -> Self {
        self.counterparty = Some(counterparty.into());
        self
    }

    /// Overrides the generated invoice number
    pub fn with_number(mut self, invoice_number: impl Into<String>) -> Self {
        self.invoice_number = invoice_number.into();
        self
    }

    /// Adds a line item and recomputes the total
    ///
    /// # Errors
    ///
    /// - `InvalidInvoiceState` once the invoice has left `Pending`
    /// - `InvalidInvoice` for a zero quantity or non-positive unit price
    /// - `Money` on currency mismatch or overflow
    pub fn add_item(&mut self, item: InvoiceItem) -> Result<(), BillingError> {
        if self.status != InvoiceStatus::Pending {
            return Err(BillingError::InvalidInvoiceState {
                invoice_id: self.id,
                status: self.status,
                operation: "add items to",
            });
        }
        item.validate()?;
        item.unit_price.ensure_same_currency(&self.total)?;

        let line_total = item.total()?;
        self.total = self.total.checked_add(&line_total)?;
        self.items.push(item);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn items(&self) -> &[InvoiceItem] {
        &self.items
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn cancellation(&self) -> Option<&Cancellation> {
        self.cancellation.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == InvoiceStatus::Cancelled
    }

    /// Checks the invoice can be persisted: at least one item and a positive total
    pub fn validate(&self) -> Result<(), BillingError> {
        if self.items.is_empty() {
            return Err(BillingError::InvalidInvoice(format!(
                "invoice {} has no line items",
                self.id
            )));
        }
        if !self.total.is_positive() {
            return Err(BillingError::InvalidInvoice(format!(
                "invoice {} total must be positive, got {}",
                self.id, self.total
            )));
        }
        self.verify_total()
    }

    /// Recomputes the line item sum and compares it with the stored total
    pub fn verify_total(&self) -> Result<(), BillingError> {
        let items = self
            .items
            .iter()
            .map(InvoiceItem::total)
            .collect::<Result<Vec<_>, _>>()?;
        let items = Money::checked_sum(&items, self.currency)?;

        if items != self.total {
            return Err(BillingError::Integrity {
                invoice_id: self.id,
                violation: IntegrityViolation::TotalMismatch {
                    stored: self.total,
                    items,
                },
            });
        }
        Ok(())
    }

    /// Recomputes the status from the given payments and stores it
    ///
    /// This is the only way a non-cancelled invoice changes status.
    ///
    /// # Errors
    ///
    /// `Integrity` if completed payments exceed the total. The stored status
    /// is left untouched in that case.
    pub fn reconcile(&mut self, payments: &[Payment]) -> Result<InvoiceStatus, BillingError> {
        let computed = reconciliation::compute_status(self, payments)?;
        if computed != self.status {
            tracing::debug!(
                invoice_id = %self.id,
                from = %self.status,
                to = %computed,
                "Invoice status recomputed"
            );
            self.status = computed;
            self.updated_at = Utc::now();
        }
        Ok(computed)
    }

    /// Cancels the invoice
    ///
    /// Existing payments are left as they are; they no longer influence the
    /// status because `Cancelled` is terminal.
    ///
    /// # Errors
    ///
    /// `InvalidInvoiceState` unless the invoice is `Pending` or `Partial`.
    pub fn cancel(
        &mut self,
        reason: impl Into<String>,
        actor: impl Into<String>,
    ) -> Result<(), BillingError> {
        if !self.status.is_cancellable() {
            return Err(BillingError::InvalidInvoiceState {
                invoice_id: self.id,
                status: self.status,
                operation: "cancel",
            });
        }

        let now = Utc::now();
        self.status = InvoiceStatus::Cancelled;
        self.cancellation = Some(Cancellation {
            reason: reason.into(),
            actor: actor.into(),
            cancelled_at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Checks if the invoice is past due and still open
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        today > self.due_date
            && matches!(self.status, InvoiceStatus::Pending | InvoiceStatus::Partial)
    }
}

/// Persisted form of an invoice, used to rebuild it from storage
///
/// Deserializes from the JSON an [`Invoice`] serializes to.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceSnapshot {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub invoice_type: InvoiceType,
    pub student_id: Option<StudentId>,
    pub counterparty: Option<String>,
    pub currency: Currency,
    pub items: Vec<InvoiceItem>,
    pub total: Money,
    pub status: InvoiceStatus,
    pub due_date: NaiveDate,
    pub cancellation: Option<Cancellation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InvoiceSnapshot> for Invoice {
    fn from(s: InvoiceSnapshot) -> Self {
        Self {
            id: s.id,
            invoice_number: s.invoice_number,
            invoice_type: s.invoice_type,
            student_id: s.student_id,
            counterparty: s.counterparty,
            currency: s.currency,
            items: s.items,
            total: s.total,
            status: s.status,
            due_date: s.due_date,
            cancellation: s.cancellation,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// A line item on an invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    /// Item ID
    pub id: LineItemId,
    /// Description (e.g. "Term 2 tuition", "Canteen")
    pub description: String,
    /// Quantity
    pub quantity: u32,
    /// Unit price
    pub unit_price: Money,
}

impl InvoiceItem {
    /// Creates a new invoice item with quantity 1
    pub fn new(description: impl Into<String>, unit_price: Money) -> Self {
        Self {
            id: LineItemId::new_v7(),
            description: description.into(),
            quantity: 1,
            unit_price,
        }
    }

    /// Sets the quantity
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Calculates the total for this item
    pub fn total(&self) -> Result<Money, BillingError> {
        Ok(self.unit_price.checked_mul(self.quantity)?)
    }

    fn validate(&self) -> Result<(), BillingError> {
        if self.quantity == 0 {
            return Err(BillingError::InvalidInvoice(format!(
                "item '{}' has zero quantity",
                self.description
            )));
        }
        if !self.unit_price.is_positive() {
            return Err(BillingError::InvalidInvoice(format!(
                "item '{}' unit price must be positive, got {}",
                self.description, self.unit_price
            )));
        }
        Ok(())
    }
}

/// Generates a human-readable invoice number from the time-ordered id
fn generate_invoice_number(id: &InvoiceId) -> String {
    let simple = id.as_uuid().simple().to_string();
    format!("INV-{}", simple[simple.len() - 10..].to_uppercase())
}
