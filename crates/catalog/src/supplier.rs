use serde::{Deserialize, Serialize};

use apotheca_core::{EngineError, EngineResult, Entity, SupplierId};

/// Supplier status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplierStatus {
    Active,
    Suspended,
}

/// Contact information for a supplier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A party the pharmacy procures from.
///
/// `rating` and `on_time_delivery_rate` start as `None` and are folded in
/// by the procurement engine as ratings and deliveries accumulate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact: ContactInfo,
    pub status: SupplierStatus,
    /// Running mean of rating overalls (1.0–5.0).
    pub rating: Option<f64>,
    /// Percentage of delivered orders that arrived on or before the
    /// expected date.
    pub on_time_delivery_rate: Option<f64>,
    pub total_orders: u32,
}

impl Supplier {
    pub fn new(id: SupplierId, name: impl Into<String>, contact: ContactInfo) -> EngineResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EngineError::validation("supplier name cannot be empty"));
        }

        Ok(Self {
            id,
            name,
            contact,
            status: SupplierStatus::Active,
            rating: None,
            on_time_delivery_rate: None,
            total_orders: 0,
        })
    }

    /// Invariant helper: whether this supplier may be selected for
    /// procurement. Suspended suppliers cannot supply.
    pub fn can_supply(&self) -> bool {
        self.status == SupplierStatus::Active
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
