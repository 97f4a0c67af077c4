//! `apotheca-engine` — the inventory consistency and alerting engine.
//!
//! One [`Engine`] instance owns the entity store and exposes the mutating
//! services (stock ledger, sale processor, alert engine, recall workflow,
//! procurement) plus cache-free read projections. Every mutating call takes
//! an explicit [`ActorContext`] for audit attribution and runs as a single
//! store transaction; the hot quantity path uses optimistic concurrency
//! with bounded retries.

mod alerting;
mod catalog_ops;
mod config;
mod ledger;
mod procurement_ops;
mod read;
mod recall_ops;
mod recorder;
mod sales_ops;
mod store;

#[cfg(test)]
mod integration_tests;

pub use config::EngineConfig;
pub use read::{BatchStatus, BatchStatusRow, MedicineRollup, SupplierPerformance};

use apotheca_core::{Clock, EngineResult, SystemClock};

use crate::store::InMemoryStore;

/// The shared-state engine facade.
///
/// Thread-safe behind `&self`; share it across threads with `Arc`.
#[derive(Debug)]
pub struct Engine<C: Clock = SystemClock> {
    pub(crate) store: InMemoryStore,
    pub(crate) clock: C,
    pub(crate) config: EngineConfig,
}

impl Engine<SystemClock> {
    /// Engine on the wall clock with default policy.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for Engine<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Engine<C> {
    pub fn with_clock(clock: C) -> Self {
        Self::with_config(clock, EngineConfig::default())
    }

    pub fn with_config(clock: C, config: EngineConfig) -> Self {
        Self {
            store: InMemoryStore::new(),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Re-run `op` while it fails with a transient conflict, up to the
    /// configured retry limit, then surface the conflict.
    pub(crate) fn retry<T>(&self, mut op: impl FnMut() -> EngineResult<T>) -> EngineResult<T> {
        let mut retries = 0;
        loop {
            match op() {
                Err(err) if err.is_transient() && retries < self.config.conflict_retry_limit => {
                    retries += 1;
                    tracing::debug!(retries, "retrying after concurrency conflict");
                }
                other => return other,
            }
        }
    }
}
