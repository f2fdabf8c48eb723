//! Payment gateway integration module
//!
//! Gateway clients for WaafiPay (purchase, withdraw, refund, pre-authorization)
//! and eDahab (invoice issue and credit), plus the composition layer that
//! chains them per route.

pub mod flow;
pub mod policy;
pub mod providers;
pub mod traits;
pub mod types;

pub use flow::{OperationKind, PaymentFlow};
pub use traits::{EDahabGateway, WaafiPayGateway};
