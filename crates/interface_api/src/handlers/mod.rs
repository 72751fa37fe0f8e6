//! Request handlers, one module per resource

pub mod health;
pub mod invoices;
pub mod payments;
pub mod funds;
pub mod loans;
pub mod audit;
