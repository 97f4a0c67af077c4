//! Stock ledger: the only paths that change batch quantities.

use chrono::NaiveDate;

use apotheca_alerts::{Alert, AlertType, receipt_expiry_severity};
use apotheca_core::{
    ActorContext, AlertId, BatchId, Clock, EngineError, EngineResult, PurchaseOrderId,
};
use apotheca_stock::{Batch, BatchSpec, InventoryMovement};

use crate::Engine;
use crate::recorder::{audit_create, audit_update};

impl<C: Clock> Engine<C> {
    /// Create a batch from a delivery in one transaction: batch row,
    /// `purchase` movement and, for short-dated stock, an expiry alert.
    pub fn receive(
        &self,
        spec: BatchSpec,
        order_id: Option<PurchaseOrderId>,
        actor: &ActorContext,
    ) -> EngineResult<BatchId> {
        let now = self.clock.now();
        let today = self.clock.today();

        let batch = Batch::receive(BatchId::new(), spec, now)?;
        let batch_id = batch.id;
        let days_left = batch.days_until_expiry(today);
        let expiry_alert = receipt_expiry_severity(days_left).map(|severity| {
            Alert::new(
                AlertId::new(),
                batch_id,
                AlertType::Expiry,
                severity,
                format!(
                    "batch {} expires in {} days",
                    batch.batch_number, days_left
                ),
                now,
            )
        });

        self.store.write(|t| {
            let medicine = t.medicine(batch.medicine_id)?;
            if !medicine.is_active {
                return Err(EngineError::validation(
                    "cannot receive stock for a deactivated medicine",
                ));
            }
            t.supplier(batch.supplier_id)?;

            t.insert_batch(batch.clone())?;
            t.movements.push(InventoryMovement::purchase(
                batch_id,
                batch.received_quantity,
                order_id,
                now,
            ));
            if let Some(alert) = expiry_alert {
                t.insert_alert(alert);
            }
            audit_create(t, "batch", batch_id, &batch, actor, now);

            tracing::info!(%batch_id, quantity = batch.received_quantity, "batch received");
            Ok(batch_id)
        })
    }

    /// Apply a signed manual correction to a batch quantity.
    ///
    /// Snapshot, validate, swap: the quantity write and the movement append
    /// commit together or not at all, and a concurrent commit in between
    /// surfaces as a (retried) conflict rather than a lost update.
    pub fn adjust(
        &self,
        batch_id: BatchId,
        delta: i64,
        reason: &str,
        actor: &ActorContext,
    ) -> EngineResult<()> {
        if delta == 0 {
            return Err(EngineError::validation("delta cannot be zero"));
        }

        let now = self.clock.now();
        self.retry(|| {
            let (before, version) = self.store.read(|t| {
                let slot = t.batch(batch_id)?;
                Ok((slot.record.clone(), slot.version))
            })?;

            let mut after = before.clone();
            after.apply_delta(delta)?;
            let movement = InventoryMovement::adjustment(batch_id, delta, reason, now);

            self.store.write(|t| {
                t.swap_batch(after.clone(), version)?;
                t.movements.push(movement.clone());
                audit_update(t, "batch", batch_id, &before, &after, actor, now);
                Ok(())
            })
        })
    }

    /// Flag every batch whose expiry date has passed.
    ///
    /// Idempotent: batches already flagged are skipped, so a second sweep
    /// with the same date mutates nothing.
    pub fn expire_sweep(&self, as_of: NaiveDate, actor: &ActorContext) -> EngineResult<usize> {
        let now = self.clock.now();
        self.store.write(|t| {
            let due: Vec<BatchId> = t
                .batches
                .values()
                .filter(|b| b.record.expiry_date < as_of && !b.record.is_expired)
                .map(|b| b.record.id)
                .collect();

            for batch_id in &due {
                let before = t.batch(*batch_id)?.record.clone();
                t.touch_batch(*batch_id, |b| b.is_expired = true)?;
                let after = t.batch(*batch_id)?.record.clone();
                audit_update(t, "batch", batch_id, &before, &after, actor, now);
            }

            if !due.is_empty() {
                tracing::info!(count = due.len(), %as_of, "expiry sweep flagged batches");
            }
            Ok(due.len())
        })
    }
}
