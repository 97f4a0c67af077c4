use core::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use apotheca_catalog::Supplier;
use apotheca_core::{
    ActorId, EngineError, EngineResult, Entity, MedicineId, PurchaseOrderId, SupplierId,
};

/// Purchase order status lifecycle.
///
/// Transitions are forward-only; `Cancelled` is reachable from any
/// non-terminal status; nothing ever cycles back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Approved,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    fn rank(self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Approved => 1,
            OrderStatus::Shipped => 2,
            OrderStatus::Delivered => 3,
            OrderStatus::Cancelled => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Forward-only transition check.
    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match target {
            OrderStatus::Cancelled => true,
            OrderStatus::Pending => false,
            _ => target.rank() > self.rank(),
        }
    }
}

/// A procurement request against one supplier for one medicine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub medicine_id: MedicineId,
    pub supplier_id: SupplierId,
    /// Deterministic for auto orders (date + medicine), the idempotent
    /// retry key.
    pub order_number: String,
    pub quantity: i64,
    pub status: OrderStatus,
    pub auto_generated: bool,
    pub ordered_on: NaiveDate,
    pub expected_delivery: NaiveDate,
    pub delivered_on: Option<NaiveDate>,
    pub created_by: ActorId,
    pub created_at: DateTime<Utc>,
}

impl PurchaseOrder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: PurchaseOrderId,
        medicine_id: MedicineId,
        supplier_id: SupplierId,
        order_number: impl Into<String>,
        quantity: i64,
        auto_generated: bool,
        ordered_on: NaiveDate,
        lead_days: i64,
        created_by: ActorId,
        created_at: DateTime<Utc>,
    ) -> EngineResult<Self> {
        if quantity <= 0 {
            return Err(EngineError::validation("order quantity must be positive"));
        }

        Ok(Self {
            id,
            medicine_id,
            supplier_id,
            order_number: order_number.into(),
            quantity,
            status: OrderStatus::Pending,
            auto_generated,
            ordered_on,
            expected_delivery: ordered_on + chrono::Duration::days(lead_days),
            delivered_on: None,
            created_by,
            created_at,
        })
    }

    /// Move the order forward; stamping the delivery date on `Delivered`.
    pub fn transition(&mut self, target: OrderStatus, on: NaiveDate) -> EngineResult<()> {
        if !self.status.can_transition_to(target) {
            return Err(EngineError::conflict(format!(
                "purchase order cannot move from {:?} to {:?}",
                self.status, target
            )));
        }

        if target == OrderStatus::Delivered {
            self.delivered_on = Some(on);
        }
        self.status = target;
        Ok(())
    }

    /// Whether a delivered order arrived on or before the expected date.
    pub fn was_on_time(&self) -> Option<bool> {
        self.delivered_on.map(|d| d <= self.expected_delivery)
    }
}

impl Entity for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Deterministic order number for auto-generated orders.
///
/// Same date + same medicine always produce the same number, so retried
/// triggers collapse onto one order.
pub fn auto_order_number(date: NaiveDate, medicine_id: MedicineId) -> String {
    let uuid = medicine_id.as_uuid().simple().to_string();
    format!("PO-{}-{}", date.format("%Y%m%d"), &uuid[..8])
}

fn cmp_nullable(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Pick the supplier for an automatic order: active, highest rating
/// (unrated rank last), ties broken by on-time delivery rate (again with
/// unknown rates last).
pub fn select_supplier<'a, I>(suppliers: I) -> Option<&'a Supplier>
where
    I: IntoIterator<Item = &'a Supplier>,
{
    suppliers
        .into_iter()
        .filter(|s| s.can_supply())
        .max_by(|a, b| {
            cmp_nullable(a.rating, b.rating)
                .then_with(|| cmp_nullable(a.on_time_delivery_rate, b.on_time_delivery_rate))
        })
}
