//! Audit recorder: best-effort before/after bookkeeping.
//!
//! Entries are appended inside the same write section as the mutation they
//! describe, so per-record ordering follows commit order. A snapshot
//! serialization failure is logged and swallowed; audit is never a blocking
//! dependency of business correctness.

use chrono::{DateTime, Utc};
use serde::Serialize;

use apotheca_audit::{AuditAction, AuditEntry, snapshot};
use apotheca_core::ActorContext;

use crate::store::Tables;

fn image<T: Serialize>(entity: &str, record: &T) -> Option<serde_json::Value> {
    match snapshot(record) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(entity, %err, "audit snapshot failed; recording without image");
            None
        }
    }
}

pub(crate) fn audit_create<T: Serialize>(
    tables: &mut Tables,
    entity: &str,
    record_id: impl ToString,
    record: &T,
    actor: &ActorContext,
    at: DateTime<Utc>,
) {
    tables.append_audit(AuditEntry::new(
        entity,
        record_id,
        AuditAction::Create,
        None,
        image(entity, record),
        actor,
        at,
    ));
}

pub(crate) fn audit_update<T: Serialize>(
    tables: &mut Tables,
    entity: &str,
    record_id: impl ToString,
    before: &T,
    after: &T,
    actor: &ActorContext,
    at: DateTime<Utc>,
) {
    tables.append_audit(AuditEntry::new(
        entity,
        record_id,
        AuditAction::Update,
        image(entity, before),
        image(entity, after),
        actor,
        at,
    ));
}

pub(crate) fn audit_delete<T: Serialize>(
    tables: &mut Tables,
    entity: &str,
    record_id: impl ToString,
    before: &T,
    actor: &ActorContext,
    at: DateTime<Utc>,
) {
    tables.append_audit(AuditEntry::new(
        entity,
        record_id,
        AuditAction::Delete,
        image(entity, before),
        None,
        actor,
        at,
    ));
}
