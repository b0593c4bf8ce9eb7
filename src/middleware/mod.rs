//! HTTP middleware: error response formatting, request IDs and request logging.

pub mod error;
pub mod logging;
