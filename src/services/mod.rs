//! Service layer sitting between the HTTP handlers and the stores.

pub mod reconciler;

pub use reconciler::{ReconcileOutcome, Reconciler};
