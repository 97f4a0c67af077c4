//! Procurement engine: automatic ordering and supplier scoring.

use apotheca_core::{
    ActorContext, Clock, EngineError, EngineResult, MedicineId, PurchaseOrderId, RatingId,
    SupplierId,
};
use apotheca_procurement::{
    OrderStatus, PurchaseOrder, RatingScores, SupplierRating, auto_order_number, mean_overall,
    on_time_rate, pick_order_quantity, select_supplier,
};

use crate::Engine;
use crate::recorder::{audit_create, audit_update};

/// What `auto_order` decided against its snapshot.
pub(crate) enum AutoOrderPlan {
    /// An order with today's deterministic number already exists.
    Existing(PurchaseOrderId),
    New(Box<PurchaseOrder>),
}

impl<C: Clock> Engine<C> {
    /// Open a purchase order for a medicine whose stock crossed the
    /// reorder threshold.
    ///
    /// Idempotent per day and medicine: the deterministic order number
    /// collapses retried triggers onto one order.
    pub fn auto_order(
        &self,
        medicine_id: MedicineId,
        actor: &ActorContext,
    ) -> EngineResult<PurchaseOrderId> {
        self.retry(|| match self.plan_auto_order(medicine_id, actor)? {
            AutoOrderPlan::Existing(id) => Ok(id),
            AutoOrderPlan::New(order) => {
                let now = self.clock.now();
                self.store.write(|t| {
                    if let Some(existing) = t.find_order_by_number(&order.order_number) {
                        return Ok(existing.id);
                    }
                    // The snapshot's supplier pick may have been suspended
                    // in between; re-plan rather than order from it.
                    if !t.supplier(order.supplier_id)?.record.can_supply() {
                        return Err(EngineError::ConcurrencyConflict);
                    }

                    let id = order.id;
                    audit_create(t, "purchase_order", id, order.as_ref(), actor, now);
                    t.orders.insert(id, *order.clone());
                    tracing::info!(%id, %medicine_id, quantity = order.quantity, "auto order opened");
                    Ok(id)
                })
            }
        })
    }

    /// Decide supplier, quantity and order number against a snapshot.
    pub(crate) fn plan_auto_order(
        &self,
        medicine_id: MedicineId,
        actor: &ActorContext,
    ) -> EngineResult<AutoOrderPlan> {
        let now = self.clock.now();
        let today = self.clock.today();

        self.store.read(|t| {
            let medicine = t.medicine(medicine_id)?;
            if !medicine.is_active {
                return Err(EngineError::validation(
                    "cannot order a deactivated medicine",
                ));
            }

            let order_number = auto_order_number(today, medicine_id);
            if let Some(existing) = t.find_order_by_number(&order_number) {
                return Ok(AutoOrderPlan::Existing(existing.id));
            }

            let supplier = select_supplier(t.suppliers.values().map(|v| &v.record))
                .ok_or(EngineError::NoEligibleSupplier)?;
            let quantity = pick_order_quantity(
                t.forecasts.iter(),
                medicine_id,
                today,
                self.config.default_order_quantity,
            );

            let order = PurchaseOrder::new(
                PurchaseOrderId::new(),
                medicine_id,
                supplier.id,
                order_number,
                quantity,
                true,
                today,
                self.config.delivery_lead_days,
                actor.actor_id,
                now,
            )?;
            Ok(AutoOrderPlan::New(Box::new(order)))
        })
    }

    /// Move an order through its lifecycle; delivery recomputes the
    /// supplier's on-time rate.
    pub fn set_order_status(
        &self,
        order_id: PurchaseOrderId,
        status: OrderStatus,
        actor: &ActorContext,
    ) -> EngineResult<()> {
        let now = self.clock.now();
        let today = self.clock.today();

        self.store.write(|t| {
            let before = t.order(order_id)?.clone();
            let mut after = before.clone();
            after.transition(status, today)?;

            let supplier_id = after.supplier_id;
            t.supplier(supplier_id)?;
            t.orders.insert(order_id, after.clone());
            audit_update(t, "purchase_order", order_id, &before, &after, actor, now);

            if status == OrderStatus::Delivered {
                let rate = on_time_rate(
                    t.orders.values().filter(|o| o.supplier_id == supplier_id),
                );
                t.touch_supplier(supplier_id, |s| s.on_time_delivery_rate = rate)?;
            }
            Ok(())
        })
    }

    /// Record a per-order supplier rating and fold it into the supplier's
    /// running average.
    #[allow(clippy::too_many_arguments)]
    pub fn rate_supplier(
        &self,
        supplier_id: SupplierId,
        order_id: PurchaseOrderId,
        quality: u8,
        delivery: u8,
        communication: u8,
        comments: Option<String>,
        actor: &ActorContext,
    ) -> EngineResult<RatingId> {
        let scores = RatingScores::new(quality, delivery, communication)?;
        let now = self.clock.now();

        self.store.write(|t| {
            let order = t.order(order_id)?;
            if order.supplier_id != supplier_id {
                return Err(EngineError::validation(
                    "order does not belong to this supplier",
                ));
            }
            let before = t.supplier(supplier_id)?.record.clone();

            let rating = SupplierRating::new(
                RatingId::new(),
                supplier_id,
                order_id,
                scores,
                comments,
                actor.actor_id,
                now,
            );
            let rating_id = rating.id;
            audit_create(t, "supplier_rating", rating_id, &rating, actor, now);
            t.ratings.insert(rating_id, rating);

            let mean = mean_overall(
                t.ratings
                    .values()
                    .filter(|r| r.supplier_id == supplier_id)
                    .map(|r| r.overall),
            );
            t.touch_supplier(supplier_id, |s| {
                s.rating = mean;
                s.total_orders += 1;
            })?;
            let after = t.supplier(supplier_id)?.record.clone();
            audit_update(t, "supplier", supplier_id, &before, &after, actor, now);

            Ok(rating_id)
        })
    }
}
