use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use apotheca_core::{BatchId, EngineError, EngineResult, Entity, MedicineId, SupplierId};

/// Everything the ledger needs to create a batch from a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSpec {
    pub medicine_id: MedicineId,
    pub supplier_id: SupplierId,
    pub batch_number: String,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub cost_price: u64,
    /// Price in smallest currency unit (e.g., cents).
    pub selling_price: u64,
    pub manufacture_date: NaiveDate,
    pub expiry_date: NaiveDate,
}

/// A received lot of one medicine from one supplier.
///
/// `quantity` is the single source of truth for availability: it is set at
/// creation, decreased by sales and disposals, and never goes negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub medicine_id: MedicineId,
    pub supplier_id: SupplierId,
    /// Unique per medicine.
    pub batch_number: String,
    pub received_quantity: i64,
    pub quantity: i64,
    pub cost_price: u64,
    pub selling_price: u64,
    pub manufacture_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub is_recalled: bool,
    pub is_expired: bool,
    pub received_at: DateTime<Utc>,
}

impl Batch {
    /// Validate a spec and create the batch record.
    pub fn receive(id: BatchId, spec: BatchSpec, received_at: DateTime<Utc>) -> EngineResult<Self> {
        if spec.batch_number.trim().is_empty() {
            return Err(EngineError::validation("batch number cannot be empty"));
        }
        if spec.quantity <= 0 {
            return Err(EngineError::validation(
                "received quantity must be positive",
            ));
        }
        if spec.manufacture_date >= spec.expiry_date {
            return Err(EngineError::validation(
                "manufacture date must precede expiry date",
            ));
        }

        Ok(Self {
            id,
            medicine_id: spec.medicine_id,
            supplier_id: spec.supplier_id,
            batch_number: spec.batch_number,
            received_quantity: spec.quantity,
            quantity: spec.quantity,
            cost_price: spec.cost_price,
            selling_price: spec.selling_price,
            manufacture_date: spec.manufacture_date,
            expiry_date: spec.expiry_date,
            is_recalled: false,
            is_expired: false,
            received_at,
        })
    }

    /// Signed days until expiry; negative once the date has passed.
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry_date - today).num_days()
    }

    /// Whether the batch counts as expired on `today`, by flag or by date.
    ///
    /// A batch past its expiry date that the sweep has not flagged yet is
    /// still expired for sale purposes.
    pub fn is_expired_as_of(&self, today: NaiveDate) -> bool {
        self.is_expired || self.expiry_date < today
    }

    /// Whether stock from this batch may be sold on `today`.
    pub fn is_sellable(&self, today: NaiveDate) -> bool {
        !self.is_recalled && !self.is_expired_as_of(today)
    }

    /// Apply a signed quantity delta, refusing to go negative.
    ///
    /// This is the only mutation path for `quantity` after creation; the
    /// caller pairs it with a movement append in one commit.
    pub fn apply_delta(&mut self, delta: i64) -> EngineResult<()> {
        let new_quantity = self.quantity + delta;
        if new_quantity < 0 {
            return Err(EngineError::insufficient_stock(
                self.id,
                -delta,
                self.quantity,
            ));
        }

        self.quantity = new_quantity;
        Ok(())
    }
}

impl Entity for Batch {
    type Id = BatchId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
