//! In-memory entity store.
//!
//! All tables live behind one `RwLock`: every mutating operation runs as a
//! single closure under the write lock, so a reader can never observe a
//! half-applied operation. Batches and suppliers carry row versions for
//! optimistic concurrency; the hot snapshot → decide → guarded-commit path
//! re-checks versions inside the write section and fails with
//! `ConcurrencyConflict` instead of losing an update.
//!
//! Intended for tests/dev and embedding; a SQL-backed store would slot in
//! behind the same commit discipline.

use std::collections::HashMap;
use std::sync::RwLock;

use apotheca_alerts::{Alert, AlertType, RaiseOutcome};
use apotheca_audit::AuditEntry;
use apotheca_catalog::{Medicine, Prescription, Supplier};
use apotheca_core::{
    AlertId, BatchId, EngineError, EngineResult, MedicineId, PrescriptionId, PurchaseOrderId,
    RatingId, RecallId, SaleId, SupplierId,
};
use apotheca_procurement::{PredictedDemand, PurchaseOrder, SupplierRating};
use apotheca_recall::Recall;
use apotheca_sales::Sale;
use apotheca_stock::{Batch, InventoryMovement};

/// A record plus its optimistic-concurrency token.
#[derive(Debug, Clone)]
pub(crate) struct Versioned<T> {
    pub record: T,
    pub version: u64,
}

impl<T> Versioned<T> {
    pub(crate) fn new(record: T) -> Self {
        Self { record, version: 1 }
    }
}

/// All engine tables. Only visible inside the engine crate; services reach
/// them through [`InMemoryStore::read`] / [`InMemoryStore::write`].
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub medicines: HashMap<MedicineId, Medicine>,
    pub suppliers: HashMap<SupplierId, Versioned<Supplier>>,
    pub batches: HashMap<BatchId, Versioned<Batch>>,
    pub prescriptions: HashMap<PrescriptionId, Prescription>,
    pub sales: HashMap<SaleId, Sale>,
    pub recalls: HashMap<RecallId, Recall>,
    pub alerts: HashMap<AlertId, Alert>,
    pub orders: HashMap<PurchaseOrderId, PurchaseOrder>,
    pub ratings: HashMap<RatingId, SupplierRating>,
    pub movements: Vec<InventoryMovement>,
    pub audit_trail: Vec<AuditEntry>,
    pub forecasts: Vec<PredictedDemand>,
}

impl Tables {
    pub fn medicine(&self, id: MedicineId) -> EngineResult<&Medicine> {
        self.medicines.get(&id).ok_or(EngineError::NotFound)
    }

    pub fn supplier(&self, id: SupplierId) -> EngineResult<&Versioned<Supplier>> {
        self.suppliers.get(&id).ok_or(EngineError::NotFound)
    }

    pub fn batch(&self, id: BatchId) -> EngineResult<&Versioned<Batch>> {
        self.batches.get(&id).ok_or(EngineError::NotFound)
    }

    pub fn prescription(&self, id: PrescriptionId) -> EngineResult<&Prescription> {
        self.prescriptions.get(&id).ok_or(EngineError::NotFound)
    }

    pub fn alert(&self, id: AlertId) -> EngineResult<&Alert> {
        self.alerts.get(&id).ok_or(EngineError::NotFound)
    }

    pub fn order(&self, id: PurchaseOrderId) -> EngineResult<&PurchaseOrder> {
        self.orders.get(&id).ok_or(EngineError::NotFound)
    }

    pub fn recall(&self, id: RecallId) -> EngineResult<&Recall> {
        self.recalls.get(&id).ok_or(EngineError::NotFound)
    }

    /// Replace a batch row if its version still matches `expected`.
    ///
    /// This is the compare-and-swap at the heart of the ledger: the caller
    /// decided against the snapshot it read at `expected`, and the swap is
    /// refused if anyone committed in between.
    pub fn swap_batch(&mut self, updated: Batch, expected: u64) -> EngineResult<()> {
        let slot = self
            .batches
            .get_mut(&updated.id)
            .ok_or(EngineError::NotFound)?;
        if slot.version != expected {
            return Err(EngineError::ConcurrencyConflict);
        }

        slot.record = updated;
        slot.version += 1;
        Ok(())
    }

    /// Mutate a batch row in place, bumping its version.
    ///
    /// For write-lock-resident mutations (sweeps) that cannot race; the
    /// snapshot-and-swap path uses [`Tables::swap_batch`] instead.
    pub fn touch_batch(&mut self, id: BatchId, f: impl FnOnce(&mut Batch)) -> EngineResult<()> {
        let slot = self.batches.get_mut(&id).ok_or(EngineError::NotFound)?;
        f(&mut slot.record);
        slot.version += 1;
        Ok(())
    }

    /// Mutate a supplier row in place, bumping its version.
    pub fn touch_supplier(
        &mut self,
        id: SupplierId,
        f: impl FnOnce(&mut Supplier),
    ) -> EngineResult<()> {
        let slot = self.suppliers.get_mut(&id).ok_or(EngineError::NotFound)?;
        f(&mut slot.record);
        slot.version += 1;
        Ok(())
    }

    /// Insert a new batch, enforcing batch-number uniqueness per medicine.
    pub fn insert_batch(&mut self, batch: Batch) -> EngineResult<()> {
        let duplicate = self.batches.values().any(|b| {
            b.record.medicine_id == batch.medicine_id && b.record.batch_number == batch.batch_number
        });
        if duplicate {
            return Err(EngineError::conflict(format!(
                "batch number '{}' already exists for this medicine",
                batch.batch_number
            )));
        }

        self.batches.insert(batch.id, Versioned::new(batch));
        Ok(())
    }

    /// Insert an alert, suppressing it when an unacknowledged alert of the
    /// same type already exists on the batch. Recall alerts are exempt:
    /// their dedup key is the recall id, and each recall event is new.
    pub fn insert_alert(&mut self, alert: Alert) -> RaiseOutcome {
        if alert.alert_type != AlertType::Recall {
            if let Some(existing) = self
                .alerts
                .values()
                .find(|a| a.blocks_duplicate(alert.batch_id, alert.alert_type))
            {
                return RaiseOutcome::Suppressed(existing.id);
            }
        }

        let id = alert.id;
        self.alerts.insert(id, alert);
        RaiseOutcome::Raised(id)
    }

    pub fn find_order_by_number(&self, order_number: &str) -> Option<&PurchaseOrder> {
        self.orders.values().find(|o| o.order_number == order_number)
    }

    /// Append an audit entry. Append-only; never fails.
    pub fn append_audit(&mut self, entry: AuditEntry) {
        self.audit_trail.push(entry);
    }

    /// Remove a medicine. RESTRICT: refused while batches reference it.
    pub fn remove_medicine(&mut self, id: MedicineId) -> EngineResult<Medicine> {
        if self.batches.values().any(|b| b.record.medicine_id == id) {
            return Err(EngineError::conflict(
                "medicine still has batches; deactivate it instead",
            ));
        }
        self.medicines.remove(&id).ok_or(EngineError::NotFound)
    }

    /// Remove a batch. RESTRICT on referencing sales; CASCADE to the
    /// batch's alerts, recalls and movements.
    pub fn remove_batch(&mut self, id: BatchId) -> EngineResult<Batch> {
        if self.sales.values().any(|s| s.batch_id == id) {
            return Err(EngineError::conflict(
                "batch has recorded sales and cannot be removed",
            ));
        }
        let removed = self.batches.remove(&id).ok_or(EngineError::NotFound)?;

        self.alerts.retain(|_, a| a.batch_id != id);
        self.recalls.retain(|_, r| r.batch_id != id);
        self.movements.retain(|m| m.batch_id != id);
        Ok(removed.record)
    }
}

/// The shared entity store.
#[derive(Debug, Default)]
pub(crate) struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a read-only closure under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> EngineResult<R>) -> EngineResult<R> {
        let tables = self
            .inner
            .read()
            .map_err(|_| EngineError::conflict("store lock poisoned"))?;
        f(&tables)
    }

    /// Run a mutating closure under the write lock.
    ///
    /// The closure is one transaction: everything it applies becomes
    /// visible at once, and an `Err` from the closure must leave the
    /// tables untouched (services validate before they mutate).
    pub fn write<R>(&self, f: impl FnOnce(&mut Tables) -> EngineResult<R>) -> EngineResult<R> {
        let mut tables = self
            .inner
            .write()
            .map_err(|_| EngineError::conflict("store lock poisoned"))?;
        f(&mut tables)
    }
}
