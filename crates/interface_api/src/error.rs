//! API error handling
//!
//! Domain and storage errors are mapped onto HTTP statuses here and rendered
//! as `{ "error", "message", "details" }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use core_kernel::MoneyError;
use domain_billing::BillingError;
use domain_fund::FundError;
use infra_db::{DatabaseError, ServiceError};

use crate::auth::AuthError;
use crate::dto::MoneyDto;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {message}")]
    NotFound { message: String, details: Option<Value> },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {message}")]
    Conflict { message: String, details: Option<Value> },

    #[error("Validation error: {message}")]
    Validation { message: String, details: Option<Value> },

    #[error("Integrity violation: {message}")]
    Integrity { message: String, details: Option<Value> },

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl ApiError {
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        ApiError::NotFound { message: message.into(), details: Some(details) }
    }

    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        ApiError::Conflict { message: message.into(), details: Some(details) }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation { message: message.into(), details: None }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Integrity { .. } | ApiError::Internal(_) | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message, details) = match self {
            ApiError::NotFound { message, details } => ("not_found", message, details),
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::Conflict { message, details } => ("conflict", message, details),
            ApiError::Validation { message, details } => ("validation_error", message, details),
            ApiError::Integrity { message, details } => ("integrity_error", message, details),
            ApiError::Internal(msg) => ("internal_error", msg, None),
            ApiError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("database_error", "A database error occurred".to_string(), None)
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        let message = err.to_string();
        match err {
            BillingError::InvoiceNotFound(id) => ApiError::not_found(message, json!({ "invoice_id": id })),
            BillingError::PaymentNotFound(id) => ApiError::not_found(message, json!({ "payment_id": id })),
            BillingError::InvalidInvoiceState { invoice_id, status, operation } => ApiError::conflict(
                message,
                json!({ "invoice_id": invoice_id, "status": status, "operation": operation }),
            ),
            BillingError::InvalidPaymentState { payment_id, status, operation } => ApiError::conflict(
                message,
                json!({ "payment_id": payment_id, "status": status, "operation": operation }),
            ),
            BillingError::Overpayment { invoice_id, attempted, already_paid, total } => ApiError::conflict(
                message,
                json!({
                    "invoice_id": invoice_id,
                    "attempted": MoneyDto::from(attempted),
                    "already_paid": MoneyDto::from(already_paid),
                    "total": MoneyDto::from(total),
                }),
            ),
            BillingError::InvalidAmount(_) | BillingError::InvalidInvoice(_) => ApiError::validation(message),
            BillingError::Integrity { invoice_id, violation } => ApiError::Integrity {
                message,
                details: Some(json!({ "invoice_id": invoice_id, "violation": violation.to_string() })),
            },
            BillingError::Money(e) => e.into(),
        }
    }
}

impl From<FundError> for ApiError {
    fn from(err: FundError) -> Self {
        let message = err.to_string();
        match err {
            FundError::FundNotFound(id) => ApiError::not_found(message, json!({ "fund_id": id })),
            FundError::TransactionNotFound(id) => ApiError::not_found(message, json!({ "transaction_id": id })),
            FundError::LoanNotFound(id) => ApiError::not_found(message, json!({ "loan_id": id })),
            FundError::InsufficientFunds { fund_id, balance, attempted } => ApiError::conflict(
                message,
                json!({
                    "fund_id": fund_id,
                    "balance": MoneyDto::from(balance),
                    "attempted": MoneyDto::from(attempted),
                }),
            ),
            FundError::FundInactive(id) => ApiError::conflict(message, json!({ "fund_id": id })),
            FundError::AlreadyReversed(id) | FundError::ReversalOfReversal(id) => {
                ApiError::conflict(message, json!({ "transaction_id": id }))
            }
            FundError::SettlementEntry { transaction_id, link } => {
                ApiError::conflict(message, json!({ "transaction_id": transaction_id, "link": link }))
            }
            FundError::InvalidLoanTransition { from, to } => {
                ApiError::conflict(message, json!({ "from": from, "to": to }))
            }
            FundError::InvalidAmount(_) | FundError::InvalidLoan(_) => ApiError::validation(message),
            FundError::Integrity { fund_id, stored, ledger } => ApiError::Integrity {
                message,
                details: Some(json!({
                    "fund_id": fund_id,
                    "stored": MoneyDto::from(stored),
                    "ledger": MoneyDto::from(ledger),
                })),
            },
            FundError::Money(e) => e.into(),
        }
    }
}

impl From<MoneyError> for ApiError {
    fn from(err: MoneyError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(_) => ApiError::NotFound { message: err.to_string(), details: None },
            DatabaseError::DuplicateEntry(_) => ApiError::Conflict { message: err.to_string(), details: None },
            DatabaseError::ForeignKeyViolation(_) => ApiError::validation(err.to_string()),
            DatabaseError::ConstraintViolation(_) => ApiError::Conflict { message: err.to_string(), details: None },
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Billing(e) => e.into(),
            ServiceError::Fund(e) => e.into(),
            ServiceError::Database(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = serde_json::to_value(&errors).ok();
        ApiError::Validation {
            message: "Request validation failed".to_string(),
            details,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{Currency, FundId, FundTransactionId, InvoiceId, Money, PaymentId};
    use domain_billing::InvoiceStatus;
    use domain_fund::{LoanStatus, TransactionLink};

    fn xof(minor: i64) -> Money {
        Money::from_minor(minor, Currency::XOF)
    }

    #[test]
    fn test_overpayment_is_conflict_with_details() {
        let err: ApiError = BillingError::Overpayment {
            invoice_id: InvoiceId::new(),
            attempted: xof(30_000),
            already_paid: xof(80_000),
            total: xof(100_000),
        }
        .into();

        assert_eq!(err.status(), StatusCode::CONFLICT);
        let ApiError::Conflict { details: Some(details), .. } = err else {
            panic!("expected conflict with details");
        };
        assert_eq!(details["total"]["currency"], "XOF");
        assert!(details["invoice_id"].is_string());
    }

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (BillingError::InvoiceNotFound(InvoiceId::new()).into(), StatusCode::NOT_FOUND),
            (
                BillingError::InvalidInvoiceState {
                    invoice_id: InvoiceId::new(),
                    status: InvoiceStatus::Cancelled,
                    operation: "record a payment on",
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (BillingError::InvalidAmount("zero".into()).into(), StatusCode::UNPROCESSABLE_ENTITY),
            (
                FundError::InsufficientFunds {
                    fund_id: FundId::new(),
                    balance: xof(50_000),
                    attempted: xof(-70_000),
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (FundError::FundInactive(FundId::new()).into(), StatusCode::CONFLICT),
            (
                FundError::SettlementEntry {
                    transaction_id: FundTransactionId::new(),
                    link: TransactionLink::Payment(PaymentId::new()),
                }
                .into(),
                StatusCode::CONFLICT,
            ),
            (
                FundError::InvalidLoanTransition { from: LoanStatus::Repaid, to: LoanStatus::Approved }.into(),
                StatusCode::CONFLICT,
            ),
            (
                FundError::Integrity { fund_id: FundId::new(), stored: xof(1), ledger: xof(0) }.into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (MoneyError::CurrencyMismatch(Currency::XOF, Currency::EUR).into(), StatusCode::UNPROCESSABLE_ENTITY),
            (DatabaseError::DuplicateEntry("funds_code_key".into()).into(), StatusCode::CONFLICT),
            (AuthError::MissingToken.into(), StatusCode::UNAUTHORIZED),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err}");
        }
    }

    #[test]
    fn test_database_error_message_hidden() {
        let response = ApiError::Database("relation \"invoices\" does not exist".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
