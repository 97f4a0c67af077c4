use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use apotheca_core::{BatchId, Entity, MovementId, PurchaseOrderId, RecallId, SaleId};

/// Movement kind: what class of event changed the quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Purchase,
    Sale,
    Disposal,
    Adjustment,
    Return,
}

/// What caused a movement; links back to the originating record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementCause {
    Sale(SaleId),
    Order(PurchaseOrderId),
    Recall(RecallId),
    Manual(String),
}

/// Append-only ledger entry: one signed quantity delta and its cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: MovementId,
    pub batch_id: BatchId,
    pub kind: MovementKind,
    pub delta: i64,
    pub cause: MovementCause,
    pub occurred_at: DateTime<Utc>,
}

impl InventoryMovement {
    /// Positive receipt of stock, optionally against a purchase order.
    pub fn purchase(
        batch_id: BatchId,
        quantity: i64,
        order_id: Option<PurchaseOrderId>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        let cause = match order_id {
            Some(id) => MovementCause::Order(id),
            None => MovementCause::Manual("direct receipt".to_string()),
        };
        Self {
            id: MovementId::new(),
            batch_id,
            kind: MovementKind::Purchase,
            delta: quantity,
            cause,
            occurred_at,
        }
    }

    /// Negative movement for a committed sale.
    pub fn sale(
        batch_id: BatchId,
        quantity: i64,
        sale_id: SaleId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            batch_id,
            kind: MovementKind::Sale,
            delta: -quantity,
            cause: MovementCause::Sale(sale_id),
            occurred_at,
        }
    }

    /// Negative movement disposing recalled stock.
    pub fn disposal(
        batch_id: BatchId,
        quantity: i64,
        recall_id: RecallId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            batch_id,
            kind: MovementKind::Disposal,
            delta: -quantity,
            cause: MovementCause::Recall(recall_id),
            occurred_at,
        }
    }

    /// Signed manual correction (stock count, damage, customer return).
    pub fn adjustment(
        batch_id: BatchId,
        delta: i64,
        reason: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        let kind = if delta > 0 {
            MovementKind::Return
        } else {
            MovementKind::Adjustment
        };
        Self {
            id: MovementId::new(),
            batch_id,
            kind,
            delta,
            cause: MovementCause::Manual(reason.into()),
            occurred_at,
        }
    }
}

impl Entity for InventoryMovement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
