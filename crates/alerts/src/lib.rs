//! Alert domain: derived notifications with deduplication rules.
//!
//! Alerts are derived from ledger state transitions and are mutable only
//! through acknowledgement. Deduplication policy lives here; atomic
//! enforcement is the store's job.

pub mod alert;
pub mod banding;

pub use alert::{Alert, AlertType, RaiseOutcome, Severity};
pub use banding::{receipt_expiry_severity, sweep_expiry_severity};
