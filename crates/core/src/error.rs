//! Domain error model.

use thiserror::Error;

use crate::id::BatchId;

/// Result type used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A sale or adjustment would drive a batch quantity below zero.
    #[error("insufficient stock in batch {batch_id}: requested {requested}, available {available}")]
    InsufficientStock {
        batch_id: BatchId,
        requested: i64,
        available: i64,
    },

    /// The medicine requires an active prescription and none was supplied.
    #[error("an active prescription is required for this medicine")]
    PrescriptionRequired,

    /// The batch is recalled or expired and cannot be sold.
    #[error("batch is recalled or expired")]
    RecalledOrExpired,

    /// No active supplier is available for procurement.
    #[error("no eligible supplier for automatic ordering")]
    NoEligibleSupplier,

    /// The alert was already acknowledged; acknowledgement happens exactly once.
    #[error("alert is already acknowledged")]
    AlreadyAcknowledged,

    /// A referenced record does not exist.
    #[error("not found")]
    NotFound,

    /// Optimistic concurrency check failed; the caller should retry the
    /// whole operation.
    #[error("concurrent modification detected, retry the operation")]
    ConcurrencyConflict,

    /// A value failed validation (e.g. malformed or out-of-range input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A uniqueness or referential-integrity conflict (e.g. duplicate batch
    /// number, restricted delete).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn insufficient_stock(batch_id: BatchId, requested: i64, available: i64) -> Self {
        Self::InsufficientStock {
            batch_id,
            requested,
            available,
        }
    }

    /// Whether the error is transient and worth an automatic retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict)
    }
}
