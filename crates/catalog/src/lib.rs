//! Catalog domain: medicines, suppliers and prescriptions.
//!
//! This crate contains the reference records the ledger transacts against,
//! implemented purely as deterministic domain logic (no IO, no locking).

pub mod medicine;
pub mod prescription;
pub mod supplier;

pub use medicine::Medicine;
pub use prescription::{Prescription, PrescriptionStatus};
pub use supplier::{ContactInfo, Supplier, SupplierStatus};
