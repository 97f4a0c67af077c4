//! Recall workflow: pull a batch out of circulation in one transaction.

use apotheca_alerts::Alert;
use apotheca_core::{ActorContext, AlertId, Clock, EngineResult, RecallId};
use apotheca_recall::{Recall, RecallRequest, RecallStatus, recall_alert_message};
use apotheca_stock::InventoryMovement;

use crate::Engine;
use crate::recorder::{audit_create, audit_update};

impl<C: Clock> Engine<C> {
    /// Record a recall in one commit: snapshot the affected quantity,
    /// dispose remaining stock, raise the critical alert.
    ///
    /// The recall alert is never suppressed by the (batch, type) dedup: it
    /// keys on the recall id, and every recall event is independently
    /// actionable.
    pub fn add_recall(&self, request: &RecallRequest, actor: &ActorContext) -> EngineResult<RecallId> {
        let now = self.clock.now();

        self.retry(|| {
            let (before, version, medicine_name) = self.store.read(|t| {
                let slot = t.batch(request.batch_id)?;
                let medicine = t.medicine(slot.record.medicine_id)?;
                Ok((slot.record.clone(), slot.version, medicine.name.clone()))
            })?;

            let recall = Recall::open(
                RecallId::new(),
                &before,
                request.clone(),
                actor.actor_id,
                now,
            )?;
            let recall_id = recall.id;

            let mut after = before.clone();
            after.is_recalled = true;
            after.apply_delta(-recall.affected_quantity)?;

            let alert = Alert::for_recall(
                AlertId::new(),
                request.batch_id,
                recall_id,
                recall_alert_message(&medicine_name, &before.batch_number, &recall.reason),
                now,
            );

            self.store.write(|t| {
                t.swap_batch(after.clone(), version)?;

                if recall.affected_quantity > 0 {
                    t.movements.push(InventoryMovement::disposal(
                        request.batch_id,
                        recall.affected_quantity,
                        recall_id,
                        now,
                    ));
                }
                t.insert_alert(alert.clone());
                audit_create(t, "recall", recall_id, &recall, actor, now);
                audit_update(t, "batch", request.batch_id, &before, &after, actor, now);
                t.recalls.insert(recall_id, recall.clone());

                tracing::warn!(
                    %recall_id,
                    batch_id = %request.batch_id,
                    affected = recall.affected_quantity,
                    "batch recalled"
                );
                Ok(recall_id)
            })
        })
    }

    /// Resolve or cancel an active recall.
    pub fn update_recall_status(
        &self,
        recall_id: RecallId,
        status: RecallStatus,
        actor: &ActorContext,
    ) -> EngineResult<()> {
        let now = self.clock.now();
        self.store.write(|t| {
            let before = t.recall(recall_id)?.clone();
            let mut after = before.clone();
            after.update_status(status)?;

            audit_update(t, "recall", recall_id, &before, &after, actor, now);
            t.recalls.insert(recall_id, after);
            Ok(())
        })
    }
}
