//! External predicted-demand feed.
//!
//! Produced by a forecasting collaborator and read-only to this engine;
//! rows are ingested verbatim and only consulted when sizing auto orders.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use apotheca_core::MedicineId;

/// One forecast row: expected demand for a medicine on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictedDemand {
    pub medicine_id: MedicineId,
    pub date: NaiveDate,
    pub quantity: i64,
}

/// Order quantity policy: the latest future-dated forecast if present,
/// else the configured default. The default is a policy constant, not a
/// derived value.
pub fn pick_order_quantity<'a>(
    forecasts: impl IntoIterator<Item = &'a PredictedDemand>,
    medicine_id: MedicineId,
    today: NaiveDate,
    default_quantity: i64,
) -> i64 {
    forecasts
        .into_iter()
        .filter(|f| f.medicine_id == medicine_id && f.date > today && f.quantity > 0)
        .max_by_key(|f| f.date)
        .map(|f| f.quantity)
        .unwrap_or(default_quantity)
}
