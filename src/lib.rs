//! Checkout backend: PayPal order creation and webhook reconciliation.
//!
//! The flow is small and deliberate: validate the cart amount, create a
//! provider order, persist a pending payment record, then fold the
//! provider's capture webhooks into that record idempotently. Webhooks
//! arrive at least once and in any order; every raw event is kept as an
//! audit trail on the record it touched.

pub mod api;
pub mod config;
pub mod database;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod payments;
pub mod services;
