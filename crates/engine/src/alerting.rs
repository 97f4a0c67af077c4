//! Alert engine: raise with dedup, acknowledge, scheduled expiry scan.

use apotheca_alerts::{Alert, AlertType, RaiseOutcome, Severity, sweep_expiry_severity};
use apotheca_core::{ActorContext, AlertId, BatchId, Clock, EngineResult};

use crate::Engine;
use crate::recorder::audit_update;

impl<C: Clock> Engine<C> {
    /// Raise an alert on a batch, suppressed when an unacknowledged alert
    /// of the same type already exists there.
    ///
    /// The lookup and insert run under one write section, so two racing
    /// raises cannot both land.
    pub fn raise_alert(
        &self,
        batch_id: BatchId,
        alert_type: AlertType,
        severity: Severity,
        message: impl Into<String>,
    ) -> EngineResult<RaiseOutcome> {
        let now = self.clock.now();
        self.store.write(|t| {
            t.batch(batch_id)?;
            let outcome = t.insert_alert(Alert::new(
                AlertId::new(),
                batch_id,
                alert_type,
                severity,
                message,
                now,
            ));
            if let RaiseOutcome::Suppressed(existing) = outcome {
                tracing::debug!(%batch_id, ?alert_type, %existing, "duplicate alert suppressed");
            }
            Ok(outcome)
        })
    }

    /// Acknowledge an alert, exactly once.
    pub fn acknowledge_alert(
        &self,
        alert_id: AlertId,
        actor: &ActorContext,
        action_taken: Option<String>,
    ) -> EngineResult<()> {
        let now = self.clock.now();
        self.store.write(|t| {
            let before = t.alert(alert_id)?.clone();
            let mut after = before.clone();
            after.acknowledge(actor.actor_id, now, action_taken)?;

            audit_update(t, "alert", alert_id, &before, &after, actor, now);
            t.alerts.insert(alert_id, after);
            Ok(())
        })
    }

    /// Scheduled sweep: raise expiry alerts for stock expiring within
    /// `threshold_days`, severity banded by days remaining.
    ///
    /// Only batches with stock on hand and no recall are scanned; existing
    /// unacknowledged expiry alerts suppress re-raising per batch.
    pub fn scan_expiring(&self, threshold_days: i64) -> EngineResult<Vec<AlertId>> {
        let now = self.clock.now();
        let today = self.clock.today();

        self.store.write(|t| {
            let candidates: Vec<(BatchId, String, i64)> = t
                .batches
                .values()
                .filter(|b| b.record.quantity > 0 && !b.record.is_recalled)
                .map(|b| {
                    let days = b.record.days_until_expiry(today);
                    (b.record.id, b.record.batch_number.clone(), days)
                })
                .filter(|(_, _, days)| (0..=threshold_days).contains(days))
                .collect();

            let mut raised = Vec::new();
            for (batch_id, batch_number, days) in candidates {
                let outcome = t.insert_alert(Alert::new(
                    AlertId::new(),
                    batch_id,
                    AlertType::Expiry,
                    sweep_expiry_severity(days),
                    format!("batch {batch_number} expires in {days} days"),
                    now,
                ));
                if let RaiseOutcome::Raised(id) = outcome {
                    raised.push(id);
                }
            }

            if !raised.is_empty() {
                tracing::info!(count = raised.len(), threshold_days, "expiry scan raised alerts");
            }
            Ok(raised)
        })
    }
}
