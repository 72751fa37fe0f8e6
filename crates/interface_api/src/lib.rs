//! HTTP API Layer
//!
//! This crate provides the REST API for invoice reconciliation and the fund
//! ledger using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for each resource
//! - **Middleware**: Authentication, request ids, tracing, audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(pool, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use infra_db::{FundLedger, IntegrityAuditor, Reconciler};

use crate::config::ApiConfig;
use crate::handlers::{audit, funds, health, invoices, loans, payments};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: ApiConfig,
    pub reconciler: Reconciler,
    pub ledger: FundLedger,
    pub auditor: IntegrityAuditor,
}

impl AppState {
    pub fn new(pool: PgPool, config: ApiConfig) -> Self {
        Self {
            reconciler: Reconciler::new(pool.clone()),
            ledger: FundLedger::new(pool.clone()),
            auditor: IntegrityAuditor::new(pool.clone()),
            pool,
            config,
        }
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `pool` - Database connection pool
/// * `config` - API configuration
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(pool: PgPool, config: ApiConfig) -> Router {
    let state = AppState::new(pool, config);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let invoice_routes = Router::new()
        .route("/", post(invoices::create_invoice).get(invoices::list_invoices))
        .route("/:id", get(invoices::get_invoice))
        .route("/:id/cancel", post(invoices::cancel_invoice))
        .route("/:id/payments", post(invoices::record_payment).get(invoices::list_payments));

    let payment_routes = Router::new()
        .route("/:id", axum::routing::delete(payments::void_payment))
        .route("/:id/confirm", post(payments::confirm_payment));

    let fund_routes = Router::new()
        .route("/", post(funds::create_fund).get(funds::list_funds))
        .route("/:id", get(funds::get_fund))
        .route("/:id/deactivate", post(funds::deactivate_fund))
        .route("/:id/transactions", get(funds::list_transactions).post(funds::apply_transaction));

    let loan_routes = Router::new()
        .route("/", post(loans::create_loan).get(loans::list_loans))
        .route("/overdue", post(loans::mark_overdue))
        .route("/:id", get(loans::get_loan))
        .route("/:id/approve", post(loans::approve_loan))
        .route("/:id/repay", post(loans::repay_loan));

    let audit_routes = Router::new()
        .route("/integrity", get(audit::integrity_sweep))
        .route("/invoices/:id", get(audit::verify_invoice))
        .route("/funds/:id", get(audit::verify_fund));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/invoices", invoice_routes)
        .nest("/payments", payment_routes)
        .nest("/funds", fund_routes)
        .route("/fund-transactions/:id/reverse", post(funds::reverse_transaction))
        .nest("/loans", loan_routes)
        .nest("/audit", audit_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
