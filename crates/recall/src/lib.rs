//! Recall domain: pulling a batch out of circulation.
//!
//! A recall snapshots the affected quantity, disposes remaining stock and
//! raises a critical alert that is never suppressed by dedup. Pure decision
//! logic; the engine crate commits the effects atomically.

pub mod recall;

pub use recall::{Recall, RecallRequest, RecallStatus, recall_alert_message};
