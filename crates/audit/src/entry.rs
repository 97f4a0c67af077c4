use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use apotheca_core::{ActorContext, ActorId, AuditEntryId, Entity, Role};

/// What kind of mutation an audit entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

/// One append-only audit record: who did what to which record, with JSON
/// before/after images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    /// Entity kind, e.g. "batch" or "sale".
    pub entity: String,
    /// Display form of the mutated record's id.
    pub record_id: String,
    pub action: AuditAction,
    pub before: Option<JsonValue>,
    pub after: Option<JsonValue>,
    pub actor_id: ActorId,
    pub actor_role: Role,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        entity: impl Into<String>,
        record_id: impl ToString,
        action: AuditAction,
        before: Option<JsonValue>,
        after: Option<JsonValue>,
        actor: &ActorContext,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            entity: entity.into(),
            record_id: record_id.to_string(),
            action,
            before,
            after,
            actor_id: actor.actor_id,
            actor_role: actor.role.clone(),
            occurred_at,
        }
    }
}

impl Entity for AuditEntry {
    type Id = AuditEntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Serialize a record into a JSON snapshot for an audit image.
pub fn snapshot<T: Serialize>(value: &T) -> Result<JsonValue, serde_json::Error> {
    serde_json::to_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_actor() -> ActorContext {
        ActorContext::new(ActorId::new(), Role::new("pharmacist"))
    }

    #[test]
    fn entry_captures_actor_and_images() {
        let actor = test_actor();
        let before = snapshot(&serde_json::json!({"quantity": 100})).unwrap();
        let after = snapshot(&serde_json::json!({"quantity": 75})).unwrap();

        let entry = AuditEntry::new(
            "batch",
            "b-1",
            AuditAction::Update,
            Some(before.clone()),
            Some(after.clone()),
            &actor,
            Utc::now(),
        );

        assert_eq!(entry.entity, "batch");
        assert_eq!(entry.action, AuditAction::Update);
        assert_eq!(entry.before, Some(before));
        assert_eq!(entry.after, Some(after));
        assert_eq!(entry.actor_id, actor.actor_id);
    }

    #[test]
    fn create_entries_typically_have_no_before_image() {
        let entry = AuditEntry::new(
            "sale",
            "s-1",
            AuditAction::Create,
            None,
            Some(serde_json::json!({"quantity_sold": 5})),
            &test_actor(),
            Utc::now(),
        );
        assert!(entry.before.is_none());
        assert!(entry.after.is_some());
    }
}
