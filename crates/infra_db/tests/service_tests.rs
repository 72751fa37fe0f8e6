//! Service tests against a real Postgres
//!
//! Each test gets its own database, so they are ignored by default. Run with
//! `cargo test -p infra_db -- --ignored` on a machine with Docker, or set
//! `DATABASE_URL` to a server where the user may create databases.

use chrono::NaiveDate;
use core_kernel::Currency;
use domain_billing::{BillingError, InvoiceStatus, PaymentMethod, PaymentStatus};
use domain_fund::{FundError, LoanStatus, TransactionLink};
use infra_db::{FundLedger, IntegrityAuditor, IntegrityFinding, NewLoan, Reconciler, RecordPayment, ServiceError};
use test_utils::{
    assert_fund_balance, create_isolated_test_database, ledger_sum_minor, xof, DateFixtures, StringFixtures,
    TestDatabase, TestFundBuilder, TestInvoiceBuilder,
};

struct Services {
    db: TestDatabase,
    reconciler: Reconciler,
    ledger: FundLedger,
    auditor: IntegrityAuditor,
}

async fn services() -> Services {
    let db = create_isolated_test_database()
        .await
        .expect("Failed to create test database");
    let pool = db.pool().clone();
    Services {
        reconciler: Reconciler::new(pool.clone()),
        ledger: FundLedger::new(pool.clone()),
        auditor: IntegrityAuditor::new(pool),
        db,
    }
}

mod reconciliation_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_partial_then_full_payment() {
        let s = services().await;
        let invoice = s
            .reconciler
            .create_invoice(TestInvoiceBuilder::new().with_total(xof(100_000)).build())
            .await
            .unwrap();

        s.reconciler
            .record_payment(RecordPayment::new(invoice.id, xof(80_000), PaymentMethod::Cash))
            .await
            .unwrap();
        let summary = s.reconciler.invoice_summary(invoice.id).await.unwrap();
        assert_eq!(summary.invoice.status(), InvoiceStatus::Partial);
        assert_eq!(summary.balance_due, xof(20_000));

        s.reconciler
            .record_payment(RecordPayment::new(invoice.id, xof(20_000), PaymentMethod::BankTransfer))
            .await
            .unwrap();
        let summary = s.reconciler.invoice_summary(invoice.id).await.unwrap();
        assert_eq!(summary.invoice.status(), InvoiceStatus::Paid);
        assert!(summary.balance_due.is_zero());
    }

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_overpayment_rejected_and_nothing_written() {
        let s = services().await;
        let invoice = s
            .reconciler
            .create_invoice(TestInvoiceBuilder::new().with_total(xof(100_000)).build())
            .await
            .unwrap();
        s.reconciler
            .record_payment(RecordPayment::new(invoice.id, xof(80_000), PaymentMethod::Cash))
            .await
            .unwrap();

        let err = s
            .reconciler
            .record_payment(RecordPayment::new(invoice.id, xof(30_000), PaymentMethod::Cash))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Billing(BillingError::Overpayment { .. })));

        let payments = s.reconciler.list_payments(invoice.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        let summary = s.reconciler.invoice_summary(invoice.id).await.unwrap();
        assert_eq!(summary.paid, xof(80_000));
        assert_eq!(summary.invoice.status(), InvoiceStatus::Partial);
    }

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_pending_payment_counts_only_once_confirmed() {
        let s = services().await;
        let invoice = s
            .reconciler
            .create_invoice(TestInvoiceBuilder::new().with_total(xof(50_000)).build())
            .await
            .unwrap();

        let pending = s
            .reconciler
            .record_pending_payment(
                RecordPayment::new(invoice.id, xof(50_000), PaymentMethod::Card).with_reference("CARD-001"),
            )
            .await
            .unwrap();
        assert_eq!(pending.status, PaymentStatus::Pending);
        let summary = s.reconciler.invoice_summary(invoice.id).await.unwrap();
        assert_eq!(summary.invoice.status(), InvoiceStatus::Pending);

        let confirmed = s.reconciler.confirm_payment(pending.id).await.unwrap();
        assert_eq!(confirmed.status, PaymentStatus::Completed);
        let summary = s.reconciler.invoice_summary(invoice.id).await.unwrap();
        assert_eq!(summary.invoice.status(), InvoiceStatus::Paid);

        let err = s.reconciler.confirm_payment(pending.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Billing(BillingError::InvalidPaymentState { .. })));
    }

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_void_payment_reopens_invoice() {
        let s = services().await;
        let invoice = s
            .reconciler
            .create_invoice(TestInvoiceBuilder::new().with_total(xof(100_000)).build())
            .await
            .unwrap();
        let payment = s
            .reconciler
            .record_payment(RecordPayment::new(invoice.id, xof(100_000), PaymentMethod::Cash))
            .await
            .unwrap();

        let voided = s
            .reconciler
            .delete_payment(payment.id, StringFixtures::void_reason())
            .await
            .unwrap();
        assert_eq!(voided.status, PaymentStatus::Voided);
        assert_eq!(voided.void_reason.as_deref(), Some(StringFixtures::void_reason()));

        let summary = s.reconciler.invoice_summary(invoice.id).await.unwrap();
        assert_eq!(summary.invoice.status(), InvoiceStatus::Pending);
        assert_eq!(summary.payments.len(), 1);

        let err = s
            .reconciler
            .delete_payment(payment.id, StringFixtures::void_reason())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Billing(BillingError::InvalidPaymentState { .. })));
    }

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_cancel_blocks_further_payments() {
        let s = services().await;
        let invoice = s
            .reconciler
            .create_invoice(TestInvoiceBuilder::new().with_total(xof(100_000)).build())
            .await
            .unwrap();
        s.reconciler
            .record_payment(RecordPayment::new(invoice.id, xof(10_000), PaymentMethod::Cash))
            .await
            .unwrap();

        let cancelled = s
            .reconciler
            .cancel_invoice(invoice.id, StringFixtures::cancel_reason(), StringFixtures::bursar())
            .await
            .unwrap();
        assert_eq!(cancelled.status(), InvoiceStatus::Cancelled);

        let err = s
            .reconciler
            .record_payment(RecordPayment::new(invoice.id, xof(10_000), PaymentMethod::Cash))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Billing(BillingError::InvalidInvoiceState { .. })));

        let err = s
            .reconciler
            .cancel_invoice(invoice.id, StringFixtures::cancel_reason(), StringFixtures::bursar())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Billing(BillingError::InvalidInvoiceState { .. })));
    }

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_listing_filters_by_status() {
        let s = services().await;
        let paid = s
            .reconciler
            .create_invoice(TestInvoiceBuilder::new().with_total(xof(1_000)).build())
            .await
            .unwrap();
        s.reconciler
            .create_invoice(TestInvoiceBuilder::new().with_total(xof(2_000)).build())
            .await
            .unwrap();
        s.reconciler
            .record_payment(RecordPayment::new(paid.id, xof(1_000), PaymentMethod::Cash))
            .await
            .unwrap();

        let all = s.reconciler.list_invoices(None, 50, 0).await.unwrap();
        assert_eq!(all.len(), 2);
        let only_paid = s
            .reconciler
            .list_invoices(Some(InvoiceStatus::Paid), 50, 0)
            .await
            .unwrap();
        assert_eq!(only_paid.len(), 1);
        assert_eq!(only_paid[0].id, paid.id);
    }
}

mod fund_effect_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_student_payment_credits_fund_and_void_reverses() {
        let s = services().await;
        let fund = s.ledger.create_fund(TestFundBuilder::new().build()).await.unwrap();
        let invoice = s
            .reconciler
            .create_invoice(TestInvoiceBuilder::new().with_total(xof(100_000)).build())
            .await
            .unwrap();

        let payment = s
            .reconciler
            .record_payment(RecordPayment::new(invoice.id, xof(60_000), PaymentMethod::Cash).with_fund(fund.id))
            .await
            .unwrap();
        assert_fund_balance(&s.ledger.get_fund(fund.id).await.unwrap(), 60_000);

        s.reconciler
            .delete_payment(payment.id, StringFixtures::void_reason())
            .await
            .unwrap();
        let fund = s.ledger.get_fund(fund.id).await.unwrap();
        assert_fund_balance(&fund, 0);

        let entries = s.ledger.list_transactions(fund.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].reverses, Some(entries[0].id));
        assert_eq!(ledger_sum_minor(s.db.pool(), fund.id.into()).await.unwrap(), 0);
    }

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_supplier_payment_without_balance_is_atomic() {
        let s = services().await;
        let fund = s.ledger.create_fund(TestFundBuilder::new().build()).await.unwrap();
        let supplier_invoice = s
            .reconciler
            .create_invoice(TestInvoiceBuilder::supplier().with_total(xof(70_000)).build())
            .await
            .unwrap();

        let err = s
            .reconciler
            .record_payment(
                RecordPayment::new(supplier_invoice.id, xof(70_000), PaymentMethod::BankTransfer).with_fund(fund.id),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Fund(FundError::InsufficientFunds { .. })));

        let summary = s.reconciler.invoice_summary(supplier_invoice.id).await.unwrap();
        assert_eq!(summary.invoice.status(), InvoiceStatus::Pending);
        assert!(summary.payments.is_empty());
        assert!(s.ledger.list_transactions(fund.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_supplier_payment_debits_fund() {
        let s = services().await;
        let fund = s.ledger.create_fund(TestFundBuilder::new().build()).await.unwrap();
        let tuition = s
            .reconciler
            .create_invoice(TestInvoiceBuilder::new().with_total(xof(100_000)).build())
            .await
            .unwrap();
        s.reconciler
            .record_payment(RecordPayment::new(tuition.id, xof(100_000), PaymentMethod::Cash).with_fund(fund.id))
            .await
            .unwrap();

        let books = s
            .reconciler
            .create_invoice(TestInvoiceBuilder::supplier().with_total(xof(70_000)).build())
            .await
            .unwrap();
        s.reconciler
            .record_payment(RecordPayment::new(books.id, xof(70_000), PaymentMethod::BankTransfer).with_fund(fund.id))
            .await
            .unwrap();

        assert_fund_balance(&s.ledger.get_fund(fund.id).await.unwrap(), 30_000);
        assert_eq!(s.auditor.verify_fund(fund.id).await.unwrap(), xof(30_000));
    }

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_reverse_transaction_rules() {
        let s = services().await;
        let fund = s.ledger.create_fund(TestFundBuilder::new().build()).await.unwrap();
        let invoice = s
            .reconciler
            .create_invoice(TestInvoiceBuilder::new().with_total(xof(10_000)).build())
            .await
            .unwrap();
        let payment = s
            .reconciler
            .record_payment(RecordPayment::new(invoice.id, xof(10_000), PaymentMethod::Cash))
            .await
            .unwrap();
        let original = s
            .ledger
            .apply_transaction(fund.id, xof(10_000), TransactionLink::Payment(payment.id), None)
            .await
            .unwrap();

        let reversal = s.ledger.reverse_transaction(original.id).await.unwrap();
        assert_eq!(reversal.amount, xof(-10_000));

        let err = s.ledger.reverse_transaction(original.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Fund(FundError::AlreadyReversed(_))));
        let err = s.ledger.reverse_transaction(reversal.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Fund(FundError::ReversalOfReversal(_))));
    }

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_payment_settlement_is_offset_only_by_voiding() {
        let s = services().await;
        let fund = s.ledger.create_fund(TestFundBuilder::new().build()).await.unwrap();
        let invoice = s
            .reconciler
            .create_invoice(TestInvoiceBuilder::new().with_total(xof(100_000)).build())
            .await
            .unwrap();
        let payment = s
            .reconciler
            .record_payment(RecordPayment::new(invoice.id, xof(100_000), PaymentMethod::Cash).with_fund(fund.id))
            .await
            .unwrap();
        let settlement = s.ledger.list_transactions(fund.id).await.unwrap().remove(0);

        let err = s.ledger.reverse_transaction(settlement.id).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Fund(FundError::SettlementEntry { transaction_id, .. }) if transaction_id == settlement.id
        ));
        assert_fund_balance(&s.ledger.get_fund(fund.id).await.unwrap(), 100_000);

        let voided = s
            .reconciler
            .delete_payment(payment.id, StringFixtures::void_reason())
            .await
            .unwrap();
        assert_eq!(voided.status, PaymentStatus::Voided);

        let summary = s.reconciler.invoice_summary(invoice.id).await.unwrap();
        assert_eq!(summary.invoice.status(), InvoiceStatus::Pending);
        assert_fund_balance(&s.ledger.get_fund(fund.id).await.unwrap(), 0);
        assert_eq!(s.auditor.verify_fund(fund.id).await.unwrap(), xof(0));
    }

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_inactive_fund_rejects_payments() {
        let s = services().await;
        let fund = s.ledger.create_fund(TestFundBuilder::new().build()).await.unwrap();
        s.ledger.deactivate_fund(fund.id).await.unwrap();
        let invoice = s
            .reconciler
            .create_invoice(TestInvoiceBuilder::new().with_total(xof(10_000)).build())
            .await
            .unwrap();

        let err = s
            .reconciler
            .record_payment(RecordPayment::new(invoice.id, xof(10_000), PaymentMethod::Cash).with_fund(fund.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Fund(FundError::FundInactive(_))));
    }

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_duplicate_fund_code_rejected() {
        let s = services().await;
        s.ledger
            .create_fund(TestFundBuilder::new().with_code("LIBRARY").build())
            .await
            .unwrap();
        let err = s
            .ledger
            .create_fund(TestFundBuilder::new().with_code("LIBRARY").build())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Database(ref e) if e.is_constraint_violation()));
    }
}

mod loan_tests {
    use super::*;

    async fn funded_pair(s: &Services, amount: i64) -> (domain_fund::Fund, domain_fund::Fund) {
        let lender = s.ledger.create_fund(TestFundBuilder::new().build()).await.unwrap();
        let borrower = s
            .ledger
            .create_fund(TestFundBuilder::new().with_name("Library Fund").build())
            .await
            .unwrap();
        let invoice = s
            .reconciler
            .create_invoice(TestInvoiceBuilder::new().with_total(xof(amount)).build())
            .await
            .unwrap();
        s.reconciler
            .record_payment(RecordPayment::new(invoice.id, xof(amount), PaymentMethod::Cash).with_fund(lender.id))
            .await
            .unwrap();
        (lender, borrower)
    }

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_loan_lifecycle_moves_principal() {
        let s = services().await;
        let (lender, borrower) = funded_pair(&s, 100_000).await;

        let loan = s
            .ledger
            .create_loan(NewLoan {
                lender_fund_id: lender.id,
                borrower_fund_id: borrower.id,
                principal: xof(40_000),
                due_date: DateFixtures::loan_due_date(),
            })
            .await
            .unwrap();
        assert_eq!(loan.status, LoanStatus::Pending);

        let approved = s.ledger.approve_loan(loan.id).await.unwrap();
        assert_eq!(approved.status, LoanStatus::Approved);
        assert_fund_balance(&s.ledger.get_fund(lender.id).await.unwrap(), 60_000);
        assert_fund_balance(&s.ledger.get_fund(borrower.id).await.unwrap(), 40_000);

        let overdue = s
            .ledger
            .mark_overdue_loans(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].status, LoanStatus::Overdue);

        let repaid = s.ledger.repay_loan(loan.id).await.unwrap();
        assert_eq!(repaid.status, LoanStatus::Repaid);
        assert_fund_balance(&s.ledger.get_fund(lender.id).await.unwrap(), 100_000);
        assert_fund_balance(&s.ledger.get_fund(borrower.id).await.unwrap(), 0);

        let err = s.ledger.repay_loan(loan.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Fund(FundError::InvalidLoanTransition { .. })));
    }

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_loan_entries_are_offset_only_by_repayment() {
        let s = services().await;
        let (lender, borrower) = funded_pair(&s, 100_000).await;
        let loan = s
            .ledger
            .create_loan(NewLoan {
                lender_fund_id: lender.id,
                borrower_fund_id: borrower.id,
                principal: xof(40_000),
                due_date: DateFixtures::loan_due_date(),
            })
            .await
            .unwrap();
        s.ledger.approve_loan(loan.id).await.unwrap();

        let disbursement = s
            .ledger
            .list_transactions(borrower.id)
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.link == TransactionLink::Loan(loan.id))
            .expect("borrower entry for the loan");
        let err = s.ledger.reverse_transaction(disbursement.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Fund(FundError::SettlementEntry { .. })));
        assert_fund_balance(&s.ledger.get_fund(borrower.id).await.unwrap(), 40_000);

        s.ledger.repay_loan(loan.id).await.unwrap();
        assert_fund_balance(&s.ledger.get_fund(lender.id).await.unwrap(), 100_000);
        assert_fund_balance(&s.ledger.get_fund(borrower.id).await.unwrap(), 0);
        assert!(s.auditor.sweep(false).await.unwrap().is_clean());
    }

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_loan_beyond_lender_balance_not_approved() {
        let s = services().await;
        let (lender, borrower) = funded_pair(&s, 10_000).await;

        let loan = s
            .ledger
            .create_loan(NewLoan {
                lender_fund_id: lender.id,
                borrower_fund_id: borrower.id,
                principal: xof(50_000),
                due_date: DateFixtures::loan_due_date(),
            })
            .await
            .unwrap();
        let err = s.ledger.approve_loan(loan.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Fund(FundError::InsufficientFunds { .. })));

        assert_eq!(s.ledger.get_loan(loan.id).await.unwrap().status, LoanStatus::Pending);
        assert_fund_balance(&s.ledger.get_fund(borrower.id).await.unwrap(), 0);
    }

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_loan_currency_mismatch() {
        let s = services().await;
        let lender = s.ledger.create_fund(TestFundBuilder::new().build()).await.unwrap();
        let borrower = s
            .ledger
            .create_fund(TestFundBuilder::new().with_currency(Currency::EUR).build())
            .await
            .unwrap();

        let err = s
            .ledger
            .create_loan(NewLoan {
                lender_fund_id: lender.id,
                borrower_fund_id: borrower.id,
                principal: xof(1_000),
                due_date: DateFixtures::loan_due_date(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Fund(FundError::InvalidLoan(_))));
    }
}

mod audit_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_sweep_detects_and_repairs_status_drift() {
        let s = services().await;
        let invoice = s
            .reconciler
            .create_invoice(TestInvoiceBuilder::new().with_total(xof(100_000)).build())
            .await
            .unwrap();
        s.reconciler
            .record_payment(RecordPayment::new(invoice.id, xof(40_000), PaymentMethod::Cash))
            .await
            .unwrap();
        assert!(s.auditor.sweep(false).await.unwrap().is_clean());

        sqlx::query("UPDATE invoices SET status = 'PAID' WHERE invoice_id = $1")
            .bind(invoice.id.as_uuid())
            .execute(s.db.pool())
            .await
            .unwrap();

        let err = s.auditor.verify_invoice(invoice.id).await.unwrap_err();
        assert!(err.is_integrity());

        let report = s.auditor.sweep(false).await.unwrap();
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.repaired, 0);

        let report = s.auditor.sweep(true).await.unwrap();
        assert_eq!(report.repaired, 1);
        assert!(matches!(
            report.findings[0],
            IntegrityFinding::StatusDrift { computed: InvoiceStatus::Partial, repaired: true, .. }
        ));
        assert!(s.auditor.sweep(false).await.unwrap().is_clean());
    }

    #[tokio::test]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_sweep_reports_fund_divergence() {
        let s = services().await;
        let fund = s.ledger.create_fund(TestFundBuilder::new().build()).await.unwrap();

        sqlx::query("UPDATE funds SET balance_minor = 5000 WHERE fund_id = $1")
            .bind(fund.id.as_uuid())
            .execute(s.db.pool())
            .await
            .unwrap();

        let report = s.auditor.sweep(true).await.unwrap();
        assert_eq!(report.funds_checked, 1);
        assert!(matches!(
            report.findings[0],
            IntegrityFinding::FundBalanceMismatch { .. }
        ));
        assert_eq!(report.repaired, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires Docker or DATABASE_URL"]
    async fn test_fund_checks_stay_clean_while_postings_run() {
        const WRITERS: usize = 6;
        const POSTINGS: usize = 40;

        let s = services().await;
        let fund = s.ledger.create_fund(TestFundBuilder::new().build()).await.unwrap();
        let invoice = s
            .reconciler
            .create_invoice(TestInvoiceBuilder::new().with_total(xof(1_000)).build())
            .await
            .unwrap();
        let payment = s
            .reconciler
            .record_payment(RecordPayment::new(invoice.id, xof(1_000), PaymentMethod::Cash))
            .await
            .unwrap();

        let (fund_id, link) = (fund.id, TransactionLink::Payment(payment.id));
        let writers: Vec<_> = (0..WRITERS)
            .map(|_| {
                let ledger = s.ledger.clone();
                tokio::spawn(async move {
                    for _ in 0..POSTINGS {
                        ledger
                            .apply_transaction(fund_id, xof(5), link, None)
                            .await
                            .unwrap();
                    }
                })
            })
            .collect();

        let mut checks = 0;
        while !writers.iter().all(|w| w.is_finished()) {
            s.auditor.verify_fund(fund.id).await.unwrap();
            let report = s.auditor.sweep(false).await.unwrap();
            assert!(report.is_clean(), "unexpected findings: {:?}", report.findings);
            checks += 1;
        }
        for writer in writers {
            writer.await.unwrap();
        }

        assert!(checks > 0);
        let expected = (WRITERS * POSTINGS * 5) as i64;
        assert_eq!(s.auditor.verify_fund(fund.id).await.unwrap(), xof(expected));
        assert_eq!(ledger_sum_minor(s.db.pool(), fund.id.into()).await.unwrap(), expected);
    }
}
