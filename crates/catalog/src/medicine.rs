use serde::{Deserialize, Serialize};

use apotheca_core::{EngineError, EngineResult, Entity, MedicineId};

/// Catalog entry: one medicine in one dosage form and strength.
///
/// Identity is immutable; a medicine is soft-deactivated rather than
/// deleted while batches still reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: MedicineId,
    pub name: String,
    pub generic_name: String,
    pub dosage_form: String,
    pub strength: String,
    pub requires_prescription: bool,
    /// Stock level at/below which status reporting flags low stock
    /// (display concern, distinct from the reorder trigger).
    pub minimum_stock_level: i64,
    /// Stock level at/below which procurement should be triggered.
    /// Convention: reorder_point > minimum_stock_level (not enforced).
    pub reorder_point: i64,
    pub is_active: bool,
}

impl Medicine {
    pub fn new(
        id: MedicineId,
        name: impl Into<String>,
        generic_name: impl Into<String>,
        dosage_form: impl Into<String>,
        strength: impl Into<String>,
        requires_prescription: bool,
        minimum_stock_level: i64,
        reorder_point: i64,
    ) -> EngineResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EngineError::validation("medicine name cannot be empty"));
        }
        if minimum_stock_level < 0 {
            return Err(EngineError::validation(
                "minimum_stock_level cannot be negative",
            ));
        }
        if reorder_point < 0 {
            return Err(EngineError::validation("reorder_point cannot be negative"));
        }

        Ok(Self {
            id,
            name,
            generic_name: generic_name.into(),
            dosage_form: dosage_form.into(),
            strength: strength.into(),
            requires_prescription,
            minimum_stock_level,
            reorder_point,
            is_active: true,
        })
    }

    /// Half the reorder point; the band below which procurement kicks in.
    pub fn reorder_half_point(&self) -> i64 {
        self.reorder_point / 2
    }
}

impl Entity for Medicine {
    type Id = MedicineId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_medicine() -> Medicine {
        Medicine::new(
            MedicineId::new(),
            "Amoxicillin 500mg",
            "amoxicillin",
            "capsule",
            "500mg",
            true,
            20,
            80,
        )
        .unwrap()
    }

    #[test]
    fn new_medicine_is_active() {
        let m = test_medicine();
        assert!(m.is_active);
        assert!(m.requires_prescription);
    }

    #[test]
    fn rejects_empty_name() {
        let err = Medicine::new(MedicineId::new(), "  ", "x", "tablet", "5mg", false, 0, 0)
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn rejects_negative_thresholds() {
        let err =
            Medicine::new(MedicineId::new(), "Ibuprofen", "ibuprofen", "tablet", "200mg", false, -1, 10)
                .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn reorder_half_point_uses_integer_division() {
        let m = test_medicine();
        assert_eq!(m.reorder_half_point(), 40);
    }
}
