//! Actor identity threaded through every mutating call.
//!
//! Authentication lives outside the engine; the authenticated caller is
//! passed in explicitly as an [`ActorContext`]. There is no ambient
//! "current user" state.

use core::str::FromStr;
use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of an authenticated actor (human user, service account, etc).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ActorId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ActorId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Role identifier attached to an actor.
///
/// Roles are intentionally opaque strings at this layer; mapping roles to
/// permissions is the authentication layer's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The authenticated caller of a mutating operation, used for audit
/// attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    pub actor_id: ActorId,
    pub role: Role,
}

impl ActorContext {
    pub fn new(actor_id: ActorId, role: Role) -> Self {
        Self { actor_id, role }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_is_an_opaque_string() {
        let role = Role::new("pharmacist");
        assert_eq!(role.as_str(), "pharmacist");
        assert_eq!(role.to_string(), "pharmacist");
    }

    #[test]
    fn actor_context_serializes_transparently() {
        let ctx = ActorContext::new(ActorId::new(), Role::new("manager"));
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["role"], "manager");
    }
}
