use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use apotheca_alerts::Severity;
use apotheca_core::{ActorId, BatchId, EngineError, EngineResult, Entity, RecallId};
use apotheca_stock::Batch;

/// Recall status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecallStatus {
    Active,
    Resolved,
    Cancelled,
}

/// Input to `add_recall`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecallRequest {
    pub batch_id: BatchId,
    pub reason: String,
    pub announced_on: NaiveDate,
    /// Who announced the recall (manufacturer, regulator).
    pub announced_by: String,
    pub severity: Severity,
    /// Handling instructions for staff.
    pub instructions: String,
}

/// One recall event on a batch.
///
/// `affected_quantity` is the batch quantity snapshotted at recall time,
/// before the disposal movement drives it to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recall {
    pub id: RecallId,
    pub batch_id: BatchId,
    pub reason: String,
    pub announced_on: NaiveDate,
    pub announced_by: String,
    pub severity: Severity,
    pub instructions: String,
    pub status: RecallStatus,
    pub affected_quantity: i64,
    pub initiated_by: ActorId,
    pub created_at: DateTime<Utc>,
}

impl Recall {
    /// Open a recall against a batch, snapshotting its current quantity.
    pub fn open(
        id: RecallId,
        batch: &Batch,
        request: RecallRequest,
        initiated_by: ActorId,
        created_at: DateTime<Utc>,
    ) -> EngineResult<Self> {
        if request.reason.trim().is_empty() {
            return Err(EngineError::validation("recall reason cannot be empty"));
        }

        Ok(Self {
            id,
            batch_id: batch.id,
            reason: request.reason,
            announced_on: request.announced_on,
            announced_by: request.announced_by,
            severity: request.severity,
            instructions: request.instructions,
            status: RecallStatus::Active,
            affected_quantity: batch.quantity,
            initiated_by,
            created_at,
        })
    }

    /// Close out the recall; only active recalls can transition.
    pub fn update_status(&mut self, status: RecallStatus) -> EngineResult<()> {
        if self.status != RecallStatus::Active {
            return Err(EngineError::conflict(
                "recall is already resolved or cancelled",
            ));
        }
        if status == RecallStatus::Active {
            return Err(EngineError::validation("recall is already active"));
        }

        self.status = status;
        Ok(())
    }
}

impl Entity for Recall {
    type Id = RecallId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Message for the critical alert raised alongside a recall.
pub fn recall_alert_message(medicine_name: &str, batch_number: &str, reason: &str) -> String {
    format!("recall of {medicine_name} batch {batch_number}: {reason}")
}
