//! Stock domain: batches and the append-only movement trail.
//!
//! Business rules for lot quantities, implemented purely as deterministic
//! domain logic (no IO, no locking). The engine crate owns atomicity.

pub mod batch;
pub mod movement;

pub use batch::{Batch, BatchSpec};
pub use movement::{InventoryMovement, MovementCause, MovementKind};
