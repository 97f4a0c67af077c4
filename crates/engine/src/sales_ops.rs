//! Sale transaction processor.

use apotheca_alerts::{Alert, AlertType, Severity};
use apotheca_catalog::{Medicine, Prescription};
use apotheca_core::{ActorContext, AlertId, Clock, EngineResult, SaleId};
use apotheca_sales::{Sale, SaleRequest, check_sale, reorder_severity, should_auto_order};
use apotheca_stock::{Batch, InventoryMovement};

use crate::Engine;
use crate::procurement_ops::AutoOrderPlan;
use crate::recorder::{audit_create, audit_update};

struct SaleSnapshot {
    batch: Batch,
    version: u64,
    medicine: Medicine,
    prescription: Option<Prescription>,
}

impl<C: Clock> Engine<C> {
    /// Validate and commit a sale.
    ///
    /// Preconditions run in order against a snapshot (recalled/expired,
    /// prescription gating, available stock). The effects land in one
    /// commit guarded by the batch version: sale row, quantity decrement
    /// with its movement, conditional reorder alert and auto order. A
    /// reader can never observe the sale without its movement and alert,
    /// or vice versa.
    pub fn record_sale(&self, request: &SaleRequest, actor: &ActorContext) -> EngineResult<SaleId> {
        let now = self.clock.now();
        let today = self.clock.today();

        self.retry(|| {
            let snap = self.store.read(|t| {
                let slot = t.batch(request.batch_id)?;
                let batch = slot.record.clone();
                let medicine = t.medicine(batch.medicine_id)?.clone();
                let prescription = match request.prescription_id {
                    Some(id) => Some(t.prescription(id)?.clone()),
                    None => None,
                };
                Ok(SaleSnapshot {
                    version: slot.version,
                    batch,
                    medicine,
                    prescription,
                })
            })?;

            check_sale(
                &snap.batch,
                &snap.medicine,
                snap.prescription.as_ref(),
                request.quantity,
                today,
            )?;

            let sale_id = SaleId::new();
            let sale = Sale::from_request(sale_id, request, snap.medicine.id, now, actor.actor_id);
            let mut after = snap.batch.clone();
            after.apply_delta(-request.quantity)?;
            let remaining = after.quantity;
            let movement =
                InventoryMovement::sale(request.batch_id, request.quantity, sale_id, now);

            let reorder = reorder_severity(remaining, snap.medicine.reorder_point);
            let order_plan = if should_auto_order(remaining, snap.medicine.reorder_point) {
                match self.plan_auto_order(snap.medicine.id, actor) {
                    Ok(plan) => Some(plan),
                    Err(err) => {
                        // Procurement trouble must not block the sale.
                        tracing::warn!(medicine_id = %snap.medicine.id, %err, "auto order skipped");
                        None
                    }
                }
            } else {
                None
            };

            self.store.write(|t| {
                t.swap_batch(after.clone(), snap.version)?;

                t.sales.insert(sale_id, sale.clone());
                t.movements.push(movement.clone());

                if let Some(severity) = reorder {
                    t.insert_alert(Alert::new(
                        AlertId::new(),
                        request.batch_id,
                        AlertType::Reorder,
                        severity,
                        format!(
                            "{} down to {} (reorder point {})",
                            snap.medicine.name, remaining, snap.medicine.reorder_point
                        ),
                        now,
                    ));
                }
                if remaining == 0 {
                    t.insert_alert(Alert::new(
                        AlertId::new(),
                        request.batch_id,
                        AlertType::OutOfStock,
                        Severity::Critical,
                        format!(
                            "batch {} of {} is out of stock",
                            snap.batch.batch_number, snap.medicine.name
                        ),
                        now,
                    ));
                }
                if let Some(AutoOrderPlan::New(order)) = &order_plan {
                    if t.find_order_by_number(&order.order_number).is_none()
                        && t.supplier(order.supplier_id)
                            .is_ok_and(|s| s.record.can_supply())
                    {
                        audit_create(t, "purchase_order", order.id, order.as_ref(), actor, now);
                        t.orders.insert(order.id, (**order).clone());
                    }
                }

                audit_create(t, "sale", sale_id, &sale, actor, now);
                audit_update(t, "batch", request.batch_id, &snap.batch, &after, actor, now);

                tracing::info!(
                    %sale_id,
                    batch_id = %request.batch_id,
                    quantity = request.quantity,
                    remaining,
                    "sale recorded"
                );
                Ok(sale_id)
            })
        })
    }
}
