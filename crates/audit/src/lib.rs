//! Audit domain: append-only before/after snapshots of mutating operations.
//!
//! Pure side-channel bookkeeping; recording is best-effort and never feeds
//! back into control flow.

pub mod entry;

pub use entry::{AuditAction, AuditEntry, snapshot};
