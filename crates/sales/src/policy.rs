//! Sale preconditions and reorder banding.

use chrono::NaiveDate;

use apotheca_alerts::Severity;
use apotheca_catalog::{Medicine, Prescription};
use apotheca_core::{EngineError, EngineResult};
use apotheca_stock::Batch;

/// Check the sale preconditions in order; the first failure wins.
///
/// Order: batch sellable (not recalled/expired), then prescription gating,
/// then available stock. Quantity sanity is checked before all three since
/// a non-positive quantity is malformed input rather than a domain refusal.
pub fn check_sale(
    batch: &Batch,
    medicine: &Medicine,
    prescription: Option<&Prescription>,
    quantity: i64,
    today: NaiveDate,
) -> EngineResult<()> {
    if quantity <= 0 {
        return Err(EngineError::validation("sale quantity must be positive"));
    }

    if !batch.is_sellable(today) {
        return Err(EngineError::RecalledOrExpired);
    }

    if medicine.requires_prescription && !prescription.is_some_and(Prescription::authorizes_sale) {
        return Err(EngineError::PrescriptionRequired);
    }

    if quantity > batch.quantity {
        return Err(EngineError::insufficient_stock(
            batch.id,
            quantity,
            batch.quantity,
        ));
    }

    Ok(())
}

/// Severity of the reorder alert for a post-sale stock level, if one is
/// due at all.
pub fn reorder_severity(remaining: i64, reorder_point: i64) -> Option<Severity> {
    if remaining > reorder_point {
        return None;
    }

    Some(if remaining == 0 {
        Severity::Critical
    } else if remaining <= reorder_point / 2 {
        Severity::High
    } else {
        Severity::Medium
    })
}

/// Whether the procurement engine should be invoked for this stock level.
pub fn should_auto_order(remaining: i64, reorder_point: i64) -> bool {
    remaining <= reorder_point / 2
}
