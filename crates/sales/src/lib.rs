//! Sales domain: the immutable sale record and the checks that gate it.
//!
//! Pure decision logic; the engine crate commits the effects atomically.

pub mod policy;
pub mod sale;

pub use policy::{check_sale, reorder_severity, should_auto_order};
pub use sale::{CustomerInfo, PaymentMethod, Sale, SaleRequest};
