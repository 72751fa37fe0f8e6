//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use chrono::NaiveDate;
use core_kernel::{Currency, FundId, InvoiceId, Money, StudentId};
use domain_billing::{Invoice, InvoiceItem, InvoiceType, Payment, PaymentMethod};
use domain_fund::Fund;

use crate::fixtures::{unique_code, xof, DateFixtures, IdFixtures, StringFixtures};

/// Builder for invoices
///
/// Defaults to a single 100,000 XOF tuition line billed to a student.
pub struct TestInvoiceBuilder {
    invoice_type: InvoiceType,
    currency: Currency,
    due_date: NaiveDate,
    student_id: Option<StudentId>,
    counterparty: Option<String>,
    items: Vec<(String, u32, Money)>,
}

impl Default for TestInvoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestInvoiceBuilder {
    /// Creates a new builder for a student invoice
    pub fn new() -> Self {
        Self {
            invoice_type: InvoiceType::Outgoing,
            currency: Currency::XOF,
            due_date: DateFixtures::term_due_date(),
            student_id: Some(IdFixtures::student_id()),
            counterparty: None,
            items: Vec::new(),
        }
    }

    /// Creates a builder for a supplier invoice
    pub fn supplier() -> Self {
        Self {
            invoice_type: InvoiceType::Incoming,
            student_id: None,
            counterparty: Some(StringFixtures::supplier().to_string()),
            ..Self::new()
        }
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = due_date;
        self
    }

    /// Adds a line item
    pub fn with_item(mut self, description: impl Into<String>, quantity: u32, unit_price: Money) -> Self {
        self.items.push((description.into(), quantity, unit_price));
        self
    }

    /// Replaces the items with one line of the given total
    pub fn with_total(mut self, total: Money) -> Self {
        self.items = vec![("Tuition".to_string(), 1, total)];
        self
    }

    /// Builds the invoice
    ///
    /// # Panics
    ///
    /// Panics if an item is rejected by the invoice.
    pub fn build(self) -> Invoice {
        let mut invoice = Invoice::new(self.invoice_type, self.currency, self.due_date);
        if let Some(student_id) = self.student_id {
            invoice = invoice.for_student(student_id);
        }
        if let Some(counterparty) = self.counterparty {
            invoice = invoice.with_counterparty(counterparty);
        }

        let items = if self.items.is_empty() {
            vec![("Tuition".to_string(), 1, Money::from_minor(100_000, self.currency))]
        } else {
            self.items
        };
        for (description, quantity, unit_price) in items {
            invoice
                .add_item(InvoiceItem::new(description, unit_price).with_quantity(quantity))
                .expect("test invoice item rejected");
        }
        invoice
    }
}

/// Builder for payments
pub struct TestPaymentBuilder {
    invoice_id: InvoiceId,
    amount: Money,
    method: PaymentMethod,
    fund_id: Option<FundId>,
    completed: bool,
}

impl TestPaymentBuilder {
    /// Creates a completed cash payment on `invoice`
    pub fn new(invoice: &Invoice, amount: Money) -> Self {
        Self {
            invoice_id: invoice.id,
            amount,
            method: PaymentMethod::Cash,
            fund_id: None,
            completed: true,
        }
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_fund(mut self, fund_id: FundId) -> Self {
        self.fund_id = Some(fund_id);
        self
    }

    /// Leaves the payment pending
    pub fn pending(mut self) -> Self {
        self.completed = false;
        self
    }

    pub fn build(self) -> Payment {
        let mut payment = Payment::new(self.invoice_id, self.amount, self.method).with_fund(self.fund_id);
        if self.completed {
            payment.complete().expect("new payment must be completable");
        }
        payment
    }
}

/// Builder for funds
pub struct TestFundBuilder {
    code: String,
    name: String,
    currency: Currency,
    allows_deficit: bool,
}

impl Default for TestFundBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFundBuilder {
    /// Creates a builder with a unique code
    pub fn new() -> Self {
        Self {
            code: unique_code(StringFixtures::canteen_code()),
            name: "Canteen Fund".to_string(),
            currency: Currency::XOF,
            allows_deficit: false,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn allowing_deficit(mut self) -> Self {
        self.allows_deficit = true;
        self
    }

    pub fn build(self) -> Fund {
        let fund = Fund::new(self.code, self.name, self.currency);
        if self.allows_deficit {
            fund.allowing_deficit()
        } else {
            fund
        }
    }
}

/// Shorthand for the default 100,000 XOF student invoice
pub fn tuition_invoice() -> Invoice {
    TestInvoiceBuilder::new().with_total(xof(100_000)).build()
}
