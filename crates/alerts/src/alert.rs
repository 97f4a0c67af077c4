use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use apotheca_core::{ActorId, AlertId, BatchId, EngineError, EngineResult, Entity, RecallId};

/// Alert category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Expiry,
    Recall,
    LowStock,
    OutOfStock,
    Reorder,
}

/// Alert severity, ordered so that `Critical` compares greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Outcome of raising an alert.
///
/// `Suppressed` carries the pre-existing unacknowledged alert that claimed
/// the dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaiseOutcome {
    Raised(AlertId),
    Suppressed(AlertId),
}

impl RaiseOutcome {
    pub fn alert_id(&self) -> AlertId {
        match self {
            RaiseOutcome::Raised(id) | RaiseOutcome::Suppressed(id) => *id,
        }
    }

    pub fn is_raised(&self) -> bool {
        matches!(self, RaiseOutcome::Raised(_))
    }
}

/// A derived notification on a batch.
///
/// At most one *unacknowledged* alert of a given type exists per batch;
/// recall alerts are the exception and key on `recall_id` instead, because
/// each recall event is independently actionable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub batch_id: BatchId,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    /// Set only for recall alerts; the dedup key for that type.
    pub recall_id: Option<RecallId>,
    pub created_at: DateTime<Utc>,
    pub is_acknowledged: bool,
    pub acknowledged_by: Option<ActorId>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub action_taken: Option<String>,
}

impl Alert {
    pub fn new(
        id: AlertId,
        batch_id: BatchId,
        alert_type: AlertType,
        severity: Severity,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            batch_id,
            alert_type,
            severity,
            message: message.into(),
            recall_id: None,
            created_at,
            is_acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            action_taken: None,
        }
    }

    /// A critical recall alert keyed on its recall event.
    pub fn for_recall(
        id: AlertId,
        batch_id: BatchId,
        recall_id: RecallId,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut alert = Self::new(
            id,
            batch_id,
            AlertType::Recall,
            Severity::Critical,
            message,
            created_at,
        );
        alert.recall_id = Some(recall_id);
        alert
    }

    /// Whether this alert holds the (batch, type) dedup key against a new
    /// candidate. Recall alerts never block anything.
    pub fn blocks_duplicate(&self, batch_id: BatchId, alert_type: AlertType) -> bool {
        !self.is_acknowledged
            && self.alert_type != AlertType::Recall
            && self.batch_id == batch_id
            && self.alert_type == alert_type
    }

    /// Transition to acknowledged, exactly once.
    pub fn acknowledge(
        &mut self,
        actor: ActorId,
        at: DateTime<Utc>,
        action_taken: Option<String>,
    ) -> EngineResult<()> {
        if self.is_acknowledged {
            return Err(EngineError::AlreadyAcknowledged);
        }

        self.is_acknowledged = true;
        self.acknowledged_by = Some(actor);
        self.acknowledged_at = Some(at);
        self.action_taken = action_taken;
        Ok(())
    }
}

impl Entity for Alert {
    type Id = AlertId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_alert() -> Alert {
        Alert::new(
            AlertId::new(),
            BatchId::new(),
            AlertType::Expiry,
            Severity::Medium,
            "expiring soon",
            Utc::now(),
        )
    }

    #[test]
    fn severity_orders_critical_highest() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn acknowledge_happens_exactly_once() {
        let mut alert = test_alert();
        let actor = ActorId::new();

        alert
            .acknowledge(actor, Utc::now(), Some("restocked".to_string()))
            .unwrap();
        assert!(alert.is_acknowledged);
        assert_eq!(alert.acknowledged_by, Some(actor));
        assert!(alert.acknowledged_at.is_some());

        let err = alert.acknowledge(actor, Utc::now(), None).unwrap_err();
        assert_eq!(err, EngineError::AlreadyAcknowledged);
    }

    #[test]
    fn unacknowledged_alert_blocks_same_batch_and_type() {
        let alert = test_alert();
        assert!(alert.blocks_duplicate(alert.batch_id, AlertType::Expiry));
        assert!(!alert.blocks_duplicate(alert.batch_id, AlertType::Reorder));
        assert!(!alert.blocks_duplicate(BatchId::new(), AlertType::Expiry));
    }

    #[test]
    fn acknowledged_alert_no_longer_blocks() {
        let mut alert = test_alert();
        alert.acknowledge(ActorId::new(), Utc::now(), None).unwrap();
        assert!(!alert.blocks_duplicate(alert.batch_id, AlertType::Expiry));
    }

    #[test]
    fn recall_alerts_never_block() {
        let alert = Alert::for_recall(
            AlertId::new(),
            BatchId::new(),
            RecallId::new(),
            "recalled",
            Utc::now(),
        );
        assert_eq!(alert.severity, Severity::Critical);
        assert!(!alert.blocks_duplicate(alert.batch_id, AlertType::Recall));
    }
}
