//! Payment provider implementations
//!
//! Concrete HTTP implementations of the gateway traits.

pub mod edahab;
pub mod waafipay;

pub use edahab::{EDahabConfig, EDahabProvider};
pub use waafipay::{WaafiPayConfig, WaafiPayProvider};
