//! Catalog and reference-data management.
//!
//! Referential integrity is explicit store policy: medicine removal is
//! RESTRICTed while batches reference it; batch removal is RESTRICTed by
//! sales and CASCADEs to the batch's alerts, recalls and movements.

use apotheca_catalog::{Medicine, Prescription, PrescriptionStatus, Supplier, SupplierStatus};
use apotheca_core::{
    ActorContext, BatchId, Clock, EngineError, EngineResult, MedicineId, PrescriptionId, SupplierId,
};
use apotheca_procurement::PredictedDemand;

use crate::Engine;
use crate::recorder::{audit_create, audit_delete, audit_update};
use crate::store::Versioned;

impl<C: Clock> Engine<C> {
    pub fn add_medicine(&self, medicine: Medicine, actor: &ActorContext) -> EngineResult<MedicineId> {
        let now = self.clock.now();
        self.store.write(|t| {
            if t.medicines.contains_key(&medicine.id) {
                return Err(EngineError::conflict("medicine already registered"));
            }

            let id = medicine.id;
            audit_create(t, "medicine", id, &medicine, actor, now);
            t.medicines.insert(id, medicine);
            tracing::info!(%id, "medicine registered");
            Ok(id)
        })
    }

    /// Soft-deactivate; the medicine stays referenceable by its batches.
    pub fn deactivate_medicine(&self, id: MedicineId, actor: &ActorContext) -> EngineResult<()> {
        let now = self.clock.now();
        self.store.write(|t| {
            let before = t.medicine(id)?.clone();
            if !before.is_active {
                return Err(EngineError::conflict("medicine is already deactivated"));
            }

            let mut after = before.clone();
            after.is_active = false;
            audit_update(t, "medicine", id, &before, &after, actor, now);
            t.medicines.insert(id, after);
            Ok(())
        })
    }

    /// Hard removal; rejected while batches reference the medicine.
    pub fn remove_medicine(&self, id: MedicineId, actor: &ActorContext) -> EngineResult<()> {
        let now = self.clock.now();
        self.store.write(|t| {
            let removed = t.remove_medicine(id)?;
            audit_delete(t, "medicine", id, &removed, actor, now);
            Ok(())
        })
    }

    /// Hard removal; rejected while sales reference the batch, cascading
    /// to its alerts, recalls and movements otherwise.
    pub fn remove_batch(&self, id: BatchId, actor: &ActorContext) -> EngineResult<()> {
        let now = self.clock.now();
        self.store.write(|t| {
            let removed = t.remove_batch(id)?;
            audit_delete(t, "batch", id, &removed, actor, now);
            Ok(())
        })
    }

    pub fn add_supplier(&self, supplier: Supplier, actor: &ActorContext) -> EngineResult<SupplierId> {
        let now = self.clock.now();
        self.store.write(|t| {
            if t.suppliers.contains_key(&supplier.id) {
                return Err(EngineError::conflict("supplier already registered"));
            }

            let id = supplier.id;
            audit_create(t, "supplier", id, &supplier, actor, now);
            t.suppliers.insert(id, Versioned::new(supplier));
            tracing::info!(%id, "supplier registered");
            Ok(id)
        })
    }

    pub fn suspend_supplier(&self, id: SupplierId, actor: &ActorContext) -> EngineResult<()> {
        let now = self.clock.now();
        self.store.write(|t| {
            let before = t.supplier(id)?.record.clone();
            if before.status == SupplierStatus::Suspended {
                return Err(EngineError::conflict("supplier is already suspended"));
            }

            t.touch_supplier(id, |s| s.status = SupplierStatus::Suspended)?;
            let after = t.supplier(id)?.record.clone();
            audit_update(t, "supplier", id, &before, &after, actor, now);
            Ok(())
        })
    }

    pub fn add_prescription(
        &self,
        prescription: Prescription,
        actor: &ActorContext,
    ) -> EngineResult<PrescriptionId> {
        let now = self.clock.now();
        self.store.write(|t| {
            if t.prescriptions.contains_key(&prescription.id) {
                return Err(EngineError::conflict("prescription already registered"));
            }

            let id = prescription.id;
            audit_create(t, "prescription", id, &prescription, actor, now);
            t.prescriptions.insert(id, prescription);
            Ok(id)
        })
    }

    /// Apply a status change reported by the prescription's issuer.
    pub fn update_prescription_status(
        &self,
        id: PrescriptionId,
        status: PrescriptionStatus,
        actor: &ActorContext,
    ) -> EngineResult<()> {
        let now = self.clock.now();
        self.store.write(|t| {
            let before = t.prescription(id)?.clone();
            let mut after = before.clone();
            after.status = status;
            audit_update(t, "prescription", id, &before, &after, actor, now);
            t.prescriptions.insert(id, after);
            Ok(())
        })
    }

    /// Ingest one row of the external predicted-demand feed, verbatim.
    pub fn ingest_forecast(&self, demand: PredictedDemand) -> EngineResult<()> {
        if demand.quantity <= 0 {
            return Err(EngineError::validation(
                "forecast quantity must be positive",
            ));
        }

        self.store.write(|t| {
            t.forecasts.push(demand);
            Ok(())
        })
    }
}
