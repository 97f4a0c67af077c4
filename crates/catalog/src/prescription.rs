use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use apotheca_core::{Entity, PrescriptionId};

/// Prescription status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionStatus {
    Active,
    Fulfilled,
    Expired,
}

/// External proof of authorization for a prescription-gated sale.
///
/// Issued and managed outside the engine; the engine only checks that a
/// referenced prescription exists and is active at sale time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: PrescriptionId,
    pub patient_name: String,
    pub prescriber: String,
    pub status: PrescriptionStatus,
    pub issued_on: NaiveDate,
}

impl Prescription {
    pub fn new(
        id: PrescriptionId,
        patient_name: impl Into<String>,
        prescriber: impl Into<String>,
        issued_on: NaiveDate,
    ) -> Self {
        Self {
            id,
            patient_name: patient_name.into(),
            prescriber: prescriber.into(),
            status: PrescriptionStatus::Active,
            issued_on,
        }
    }

    /// Whether this prescription authorizes a sale right now.
    pub fn authorizes_sale(&self) -> bool {
        self.status == PrescriptionStatus::Active
    }
}

impl Entity for Prescription {
    type Id = PrescriptionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
