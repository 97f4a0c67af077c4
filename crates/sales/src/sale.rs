use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use apotheca_core::{ActorId, BatchId, Entity, MedicineId, PrescriptionId, SaleId};

/// How the buyer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Mobile,
    Insurance,
}

/// Who bought; free-form, supplied by the point of sale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub contact: Option<String>,
}

/// Input to `record_sale`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    pub batch_id: BatchId,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    pub prescription_id: Option<PrescriptionId>,
    pub customer: CustomerInfo,
    pub payment: PaymentMethod,
}

/// An immutable record of one sale event against one batch.
///
/// `total_amount` is exact integer arithmetic: quantity × unit price in the
/// smallest currency unit. No rounding is involved anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub batch_id: BatchId,
    pub medicine_id: MedicineId,
    pub quantity_sold: i64,
    pub unit_price: u64,
    pub total_amount: u64,
    pub prescription_id: Option<PrescriptionId>,
    pub customer: CustomerInfo,
    pub payment: PaymentMethod,
    pub sold_at: DateTime<Utc>,
    pub sold_by: ActorId,
}

impl Sale {
    /// Build the sale record from a validated request.
    ///
    /// Callers are expected to have run `check_sale` first; this only does
    /// the arithmetic.
    pub fn from_request(
        id: SaleId,
        request: &SaleRequest,
        medicine_id: MedicineId,
        sold_at: DateTime<Utc>,
        sold_by: ActorId,
    ) -> Self {
        Self {
            id,
            batch_id: request.batch_id,
            medicine_id,
            quantity_sold: request.quantity,
            unit_price: request.unit_price,
            total_amount: request.quantity as u64 * request.unit_price,
            prescription_id: request.prescription_id,
            customer: request.customer.clone(),
            payment: request.payment,
            sold_at,
            sold_by,
        }
    }
}

impl Entity for Sale {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
