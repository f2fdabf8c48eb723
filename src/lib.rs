//! Payment gateway facade for WaafiPay and eDahab.
//!
//! Validates inbound payment requests, forwards them to the gateways, and
//! chains an optional secondary withdraw / credit call per request.

pub mod api;
pub mod config;
pub mod error;
pub mod payments;
pub mod validation;

pub use error::{AppError, AppErrorKind, AppResult, ExternalError};
