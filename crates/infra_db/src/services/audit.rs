//! Integrity auditor
//!
//! Re-derives every invoice status and fund balance from the stored payments
//! and ledger entries and reports where the stored values disagree. The only
//! repair it ever performs is persisting the output of the status function
//! for an invoice whose status drifted; overpaid invoices, total mismatches
//! and fund balance divergences need a human.

use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info};

use core_kernel::{FundId, InvoiceId, Money};
use domain_billing::{reconciliation, BillingError, IntegrityViolation, InvoiceStatus};
use domain_fund::{ledger, Fund, FundError, FundTransaction};

use super::alert;
use crate::error::ServiceError;
use crate::repositories::{FundRepository, InvoiceRepository, PaymentRepository};

/// One invariant violation found by a sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityFinding {
    StatusDrift {
        invoice_id: InvoiceId,
        stored: InvoiceStatus,
        computed: InvoiceStatus,
        repaired: bool,
    },
    Overpaid {
        invoice_id: InvoiceId,
        paid: Money,
        total: Money,
    },
    TotalMismatch {
        invoice_id: InvoiceId,
        stored: Money,
        items: Money,
    },
    FundBalanceMismatch {
        fund_id: FundId,
        stored: Money,
        ledger: Money,
    },
}

/// Outcome of a full sweep
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub invoices_checked: usize,
    pub funds_checked: usize,
    pub repaired: usize,
    pub findings: Vec<IntegrityFinding>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Service that verifies stored invoices and funds against their invariants
#[derive(Debug, Clone)]
pub struct IntegrityAuditor {
    pool: PgPool,
    invoices: InvoiceRepository,
    payments: PaymentRepository,
    funds: FundRepository,
}

impl IntegrityAuditor {
    /// Creates a new IntegrityAuditor with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            invoices: InvoiceRepository::new(),
            payments: PaymentRepository::new(),
            funds: FundRepository::new(),
        }
    }

    /// Checks one invoice and returns its computed status
    ///
    /// # Errors
    ///
    /// `Integrity` if the paid sum exceeds the total, the total differs from
    /// the item sum, or the stored status differs from the computed one.
    pub async fn verify_invoice(&self, invoice_id: InvoiceId) -> Result<InvoiceStatus, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let invoice = self
            .invoices
            .find_for_update(&mut tx, invoice_id)
            .await?
            .ok_or(BillingError::InvoiceNotFound(invoice_id))?;
        let payments = self.payments.for_invoice(&mut tx, invoice_id).await?;
        tx.commit().await?;

        reconciliation::verify(&invoice, &payments).map_err(alert)
    }

    /// Checks one fund and returns its ledger sum
    ///
    /// # Errors
    ///
    /// `Integrity` if the stored balance differs from the ledger sum.
    pub async fn verify_fund(&self, fund_id: FundId) -> Result<Money, ServiceError> {
        let (fund, entries) = self
            .fund_with_ledger(fund_id)
            .await?
            .ok_or(FundError::FundNotFound(fund_id))?;

        ledger::verify_balance(&fund, &entries).map_err(alert)
    }

    /// Verifies every invoice and fund
    ///
    /// With `repair`, drifted invoice statuses are rewritten from the status
    /// function under the invoice's row lock. Nothing else is changed.
    ///
    /// # Errors
    ///
    /// Only storage failures abort the sweep; invariant violations are
    /// collected in the report.
    pub async fn sweep(&self, repair: bool) -> Result<IntegrityReport, ServiceError> {
        let mut report = IntegrityReport::default();

        let invoice_ids = {
            let mut conn = self.pool.acquire().await?;
            self.invoices.list_ids(&mut conn).await?
        };
        for invoice_id in invoice_ids {
            report.invoices_checked += 1;
            if let Some(finding) = self.sweep_invoice(invoice_id, repair).await? {
                if matches!(finding, IntegrityFinding::StatusDrift { repaired: true, .. }) {
                    report.repaired += 1;
                }
                report.findings.push(finding);
            }
        }

        let fund_ids: Vec<FundId> = {
            let mut conn = self.pool.acquire().await?;
            self.funds.list(&mut conn).await?.into_iter().map(|f| f.id).collect()
        };
        for fund_id in fund_ids {
            let Some((fund, entries)) = self.fund_with_ledger(fund_id).await? else {
                continue;
            };
            report.funds_checked += 1;
            match ledger::verify_balance(&fund, &entries) {
                Ok(_) => {}
                Err(FundError::Integrity { fund_id, stored, ledger }) => {
                    error!(
                        alert = "integrity",
                        fund_id = %fund_id,
                        stored = %stored,
                        ledger = %ledger,
                        "Fund balance diverges from ledger"
                    );
                    report.findings.push(IntegrityFinding::FundBalanceMismatch { fund_id, stored, ledger });
                }
                Err(other) => return Err(other.into()),
            }
        }

        info!(
            invoices = report.invoices_checked,
            funds = report.funds_checked,
            findings = report.findings.len(),
            repaired = report.repaired,
            "Integrity sweep finished"
        );
        Ok(report)
    }

    /// Reads a fund and its ledger under the fund's row lock
    ///
    /// Postings lock the fund before appending, so no entry can land between
    /// the two reads.
    async fn fund_with_ledger(
        &self,
        fund_id: FundId,
    ) -> Result<Option<(Fund, Vec<FundTransaction>)>, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let Some(fund) = self.funds.find_for_update(&mut tx, fund_id).await? else {
            return Ok(None);
        };
        let entries = self.funds.transactions(&mut tx, fund_id).await?;
        tx.commit().await?;
        Ok(Some((fund, entries)))
    }

    async fn sweep_invoice(
        &self,
        invoice_id: InvoiceId,
        repair: bool,
    ) -> Result<Option<IntegrityFinding>, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let Some(mut invoice) = self.invoices.find_for_update(&mut tx, invoice_id).await? else {
            return Ok(None);
        };
        let payments = self.payments.for_invoice(&mut tx, invoice_id).await?;

        let violation = match reconciliation::verify(&invoice, &payments) {
            Ok(_) => return Ok(None),
            Err(BillingError::Integrity { violation, .. }) => violation,
            Err(other) => return Err(other.into()),
        };

        let finding = match violation {
            IntegrityViolation::StatusDrift { stored, computed } => {
                let repaired = if repair {
                    invoice.reconcile(&payments)?;
                    self.invoices.update_status(&mut tx, &invoice).await?;
                    tx.commit().await?;
                    true
                } else {
                    false
                };
                IntegrityFinding::StatusDrift {
                    invoice_id,
                    stored,
                    computed,
                    repaired,
                }
            }
            IntegrityViolation::Overpaid { paid, total } => IntegrityFinding::Overpaid {
                invoice_id,
                paid,
                total,
            },
            IntegrityViolation::TotalMismatch { stored, items } => IntegrityFinding::TotalMismatch {
                invoice_id,
                stored,
                items,
            },
        };

        error!(alert = "integrity", invoice_id = %invoice_id, finding = ?finding, "Invoice integrity violation");
        Ok(Some(finding))
    }
}
