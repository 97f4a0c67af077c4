//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $t:ident) => {
        $(#[$doc])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(Uuid);

        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
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

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = EngineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s).map_err(|e| {
                    EngineError::validation(format!("{}: {}", stringify!($t), e))
                })?;
                Ok(Self(uuid))
            }
        }
    };
}

uuid_id!(
    /// Identifier of a medicine catalog entry.
    MedicineId
);
uuid_id!(
    /// Identifier of a supplier.
    SupplierId
);
uuid_id!(
    /// Identifier of a received batch (one lot of one medicine).
    BatchId
);
uuid_id!(
    /// Identifier of an immutable sale record.
    SaleId
);
uuid_id!(
    /// Identifier of a prescription (external proof of authorization).
    PrescriptionId
);
uuid_id!(
    /// Identifier of a recall event on a batch.
    RecallId
);
uuid_id!(
    /// Identifier of a derived alert.
    AlertId
);
uuid_id!(
    /// Identifier of a purchase order.
    PurchaseOrderId
);
uuid_id!(
    /// Identifier of a supplier rating entry.
    RatingId
);
uuid_id!(
    /// Identifier of an append-only inventory movement.
    MovementId
);
uuid_id!(
    /// Identifier of an append-only audit log entry.
    AuditEntryId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_round_trip() {
        let id = BatchId::new();
        let parsed: BatchId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "not-a-uuid".parse::<MedicineId>().unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn ids_are_time_ordered() {
        // UUIDv7 identifiers sort by creation time.
        let a = SaleId::new();
        let b = SaleId::new();
        assert!(a <= b);
    }
}
