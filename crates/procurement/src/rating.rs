use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use apotheca_core::{
    ActorId, EngineError, EngineResult, Entity, PurchaseOrderId, RatingId, SupplierId,
};

use crate::order::{OrderStatus, PurchaseOrder};

/// The three 1–5 scores a supplier is rated on per order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingScores {
    pub quality: u8,
    pub delivery: u8,
    pub communication: u8,
}

impl RatingScores {
    pub fn new(quality: u8, delivery: u8, communication: u8) -> EngineResult<Self> {
        for (name, score) in [
            ("quality", quality),
            ("delivery", delivery),
            ("communication", communication),
        ] {
            if !(1..=5).contains(&score) {
                return Err(EngineError::validation(format!(
                    "{name} score must be between 1 and 5"
                )));
            }
        }

        Ok(Self {
            quality,
            delivery,
            communication,
        })
    }

    /// Arithmetic mean of the three scores.
    pub fn overall(&self) -> f64 {
        f64::from(u16::from(self.quality) + u16::from(self.delivery) + u16::from(self.communication))
            / 3.0
    }
}

/// One rating of one supplier against one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierRating {
    pub id: RatingId,
    pub supplier_id: SupplierId,
    pub order_id: PurchaseOrderId,
    pub scores: RatingScores,
    pub overall: f64,
    pub comments: Option<String>,
    pub rated_by: ActorId,
    pub created_at: DateTime<Utc>,
}

impl SupplierRating {
    pub fn new(
        id: RatingId,
        supplier_id: SupplierId,
        order_id: PurchaseOrderId,
        scores: RatingScores,
        comments: Option<String>,
        rated_by: ActorId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            supplier_id,
            order_id,
            overall: scores.overall(),
            scores,
            comments,
            rated_by,
            created_at,
        }
    }
}

impl Entity for SupplierRating {
    type Id = RatingId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Mean of all historical overalls; `None` when there are none.
pub fn mean_overall(overalls: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0u32;
    for overall in overalls {
        sum += overall;
        count += 1;
    }
    (count > 0).then(|| sum / f64::from(count))
}

/// On-time delivery rate over a supplier's delivered orders, as a
/// percentage. `None` until something has been delivered.
pub fn on_time_rate<'a>(orders: impl IntoIterator<Item = &'a PurchaseOrder>) -> Option<f64> {
    let mut delivered = 0u32;
    let mut on_time = 0u32;
    for order in orders {
        if order.status != OrderStatus::Delivered {
            continue;
        }
        delivered += 1;
        if order.was_on_time() == Some(true) {
            on_time += 1;
        }
    }
    (delivered > 0).then(|| f64::from(on_time) / f64::from(delivered) * 100.0)
}
