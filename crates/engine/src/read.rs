//! Read-only projections: derived, cache-free, recomputed per call.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use apotheca_alerts::Alert;
use apotheca_alerts::banding::{CRITICAL_EXPIRY_DAYS, NEAR_EXPIRY_DAYS};
use apotheca_audit::AuditEntry;
use apotheca_catalog::Medicine;
use apotheca_core::{
    AlertId, BatchId, Clock, EngineResult, MedicineId, PurchaseOrderId, RecallId, SaleId,
    SupplierId,
};
use apotheca_procurement::PurchaseOrder;
use apotheca_recall::Recall;
use apotheca_sales::Sale;
use apotheca_stock::{Batch, InventoryMovement};

use crate::Engine;

/// Stock status of one batch; most severe condition wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Recalled,
    Expired,
    CriticalExpiry,
    NearExpiry,
    LowStock,
    Ok,
}

fn classify(batch: &Batch, medicine: &Medicine, today: NaiveDate) -> BatchStatus {
    if batch.is_recalled {
        BatchStatus::Recalled
    } else if batch.is_expired_as_of(today) {
        BatchStatus::Expired
    } else if batch.days_until_expiry(today) <= CRITICAL_EXPIRY_DAYS {
        BatchStatus::CriticalExpiry
    } else if batch.days_until_expiry(today) <= NEAR_EXPIRY_DAYS {
        BatchStatus::NearExpiry
    } else if batch.quantity <= medicine.minimum_stock_level {
        BatchStatus::LowStock
    } else {
        BatchStatus::Ok
    }
}

/// One row of the per-batch stock status listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatusRow {
    pub batch_id: BatchId,
    pub medicine_id: MedicineId,
    pub batch_number: String,
    pub quantity: i64,
    pub expiry_date: NaiveDate,
    pub status: BatchStatus,
}

/// Per-medicine aggregate across its batches and trailing sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineRollup {
    pub medicine_id: MedicineId,
    pub name: String,
    pub total_stock: i64,
    pub near_expiry_batches: usize,
    pub recalled_batches: usize,
    pub units_sold_30d: i64,
    pub revenue_30d: u64,
    pub needs_reorder: bool,
}

/// Supplier scorecard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierPerformance {
    pub supplier_id: SupplierId,
    pub name: String,
    pub rating: Option<f64>,
    pub on_time_delivery_rate: Option<f64>,
    pub total_orders: u32,
    pub delivered_orders: usize,
    pub open_orders: usize,
}

impl<C: Clock> Engine<C> {
    /// Status of one batch, most severe condition first.
    pub fn batch_status(&self, batch_id: BatchId) -> EngineResult<BatchStatus> {
        let today = self.clock.today();
        self.store.read(|t| {
            let batch = &t.batch(batch_id)?.record;
            let medicine = t.medicine(batch.medicine_id)?;
            Ok(classify(batch, medicine, today))
        })
    }

    /// Status listing across all batches.
    pub fn stock_status(&self) -> EngineResult<Vec<BatchStatusRow>> {
        let today = self.clock.today();
        self.store.read(|t| {
            let mut rows: Vec<BatchStatusRow> = t
                .batches
                .values()
                .filter_map(|slot| {
                    let batch = &slot.record;
                    let medicine = t.medicines.get(&batch.medicine_id)?;
                    Some(BatchStatusRow {
                        batch_id: batch.id,
                        medicine_id: batch.medicine_id,
                        batch_number: batch.batch_number.clone(),
                        quantity: batch.quantity,
                        expiry_date: batch.expiry_date,
                        status: classify(batch, medicine, today),
                    })
                })
                .collect();
            rows.sort_by_key(|r| (r.expiry_date, r.batch_id));
            Ok(rows)
        })
    }

    /// Unacknowledged alerts, critical first, newest first within a band.
    pub fn unacknowledged_alerts(&self) -> EngineResult<Vec<Alert>> {
        self.store.read(|t| {
            let mut alerts: Vec<Alert> = t
                .alerts
                .values()
                .filter(|a| !a.is_acknowledged)
                .cloned()
                .collect();
            alerts.sort_by(|a, b| {
                b.severity
                    .cmp(&a.severity)
                    .then(b.created_at.cmp(&a.created_at))
            });
            Ok(alerts)
        })
    }

    /// Aggregate stock, expiry and trailing-30-day sales for one medicine.
    pub fn medicine_rollup(&self, medicine_id: MedicineId) -> EngineResult<MedicineRollup> {
        let now = self.clock.now();
        let today = self.clock.today();
        let window_start = now - Duration::days(30);

        self.store.read(|t| {
            let medicine = t.medicine(medicine_id)?;

            let batches: Vec<&Batch> = t
                .batches
                .values()
                .map(|slot| &slot.record)
                .filter(|b| b.medicine_id == medicine_id)
                .collect();

            let total_stock = batches.iter().map(|b| b.quantity).sum::<i64>();
            let near_expiry_batches = batches
                .iter()
                .filter(|b| {
                    b.quantity > 0
                        && !b.is_recalled
                        && (0..=NEAR_EXPIRY_DAYS).contains(&b.days_until_expiry(today))
                })
                .count();
            let recalled_batches = batches.iter().filter(|b| b.is_recalled).count();

            let (units_sold_30d, revenue_30d) = t
                .sales
                .values()
                .filter(|s| s.medicine_id == medicine_id && s.sold_at >= window_start)
                .fold((0i64, 0u64), |(units, revenue), s| {
                    (units + s.quantity_sold, revenue + s.total_amount)
                });

            Ok(MedicineRollup {
                medicine_id,
                name: medicine.name.clone(),
                total_stock,
                near_expiry_batches,
                recalled_batches,
                units_sold_30d,
                revenue_30d,
                needs_reorder: total_stock <= medicine.reorder_point,
            })
        })
    }

    /// Supplier scorecard: rating, delivery performance, order counts.
    pub fn supplier_performance(&self, supplier_id: SupplierId) -> EngineResult<SupplierPerformance> {
        self.store.read(|t| {
            let supplier = &t.supplier(supplier_id)?.record;

            let orders: Vec<&PurchaseOrder> = t
                .orders
                .values()
                .filter(|o| o.supplier_id == supplier_id)
                .collect();
            let delivered_orders = orders
                .iter()
                .filter(|o| o.status == apotheca_procurement::OrderStatus::Delivered)
                .count();
            let open_orders = orders.iter().filter(|o| !o.status.is_terminal()).count();

            Ok(SupplierPerformance {
                supplier_id,
                name: supplier.name.clone(),
                rating: supplier.rating,
                on_time_delivery_rate: supplier.on_time_delivery_rate,
                total_orders: supplier.total_orders,
                delivered_orders,
                open_orders,
            })
        })
    }

    // Record accessors for callers and tests; clones, never references
    // into the store.

    pub fn get_batch(&self, id: BatchId) -> EngineResult<Batch> {
        self.store.read(|t| Ok(t.batch(id)?.record.clone()))
    }

    pub fn get_sale(&self, id: SaleId) -> EngineResult<Sale> {
        self.store
            .read(|t| t.sales.get(&id).cloned().ok_or(apotheca_core::EngineError::NotFound))
    }

    pub fn get_alert(&self, id: AlertId) -> EngineResult<Alert> {
        self.store.read(|t| Ok(t.alert(id)?.clone()))
    }

    pub fn get_order(&self, id: PurchaseOrderId) -> EngineResult<PurchaseOrder> {
        self.store.read(|t| Ok(t.order(id)?.clone()))
    }

    pub fn get_recall(&self, id: RecallId) -> EngineResult<Recall> {
        self.store.read(|t| Ok(t.recall(id)?.clone()))
    }

    /// Movement trail for one batch, in append order.
    pub fn movements_for(&self, batch_id: BatchId) -> EngineResult<Vec<InventoryMovement>> {
        self.store.read(|t| {
            Ok(t.movements
                .iter()
                .filter(|m| m.batch_id == batch_id)
                .cloned()
                .collect())
        })
    }

    /// All alerts on one batch, acknowledged or not.
    pub fn alerts_for_batch(&self, batch_id: BatchId) -> EngineResult<Vec<Alert>> {
        self.store.read(|t| {
            Ok(t.alerts
                .values()
                .filter(|a| a.batch_id == batch_id)
                .cloned()
                .collect())
        })
    }

    /// The audit trail, in append order.
    pub fn audit_trail(&self) -> EngineResult<Vec<AuditEntry>> {
        self.store.read(|t| Ok(t.audit_trail.clone()))
    }
}
