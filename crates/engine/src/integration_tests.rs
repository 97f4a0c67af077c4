//! Integration tests for the full engine: services against the shared
//! store, including the concurrency guarantees.

use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;

use apotheca_alerts::{AlertType, Severity};
use apotheca_audit::AuditAction;
use apotheca_catalog::{ContactInfo, Medicine, Prescription, PrescriptionStatus, Supplier};
use apotheca_core::{
    ActorContext, ActorId, BatchId, EngineError, FixedClock, MedicineId, Role, SupplierId,
};
use apotheca_procurement::{OrderStatus, PredictedDemand};
use apotheca_recall::{RecallRequest, RecallStatus};
use apotheca_sales::{CustomerInfo, PaymentMethod, SaleRequest};
use apotheca_stock::{BatchSpec, MovementKind};

use crate::{BatchStatus, Engine};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn setup() -> Engine<FixedClock> {
    apotheca_observability::init();
    Engine::with_clock(FixedClock::at_date(today()))
}

fn actor() -> ActorContext {
    ActorContext::new(ActorId::new(), Role::new("pharmacist"))
}

fn add_medicine(engine: &Engine<FixedClock>, requires_prescription: bool) -> MedicineId {
    let medicine = Medicine::new(
        MedicineId::new(),
        "Amoxicillin 500mg",
        "amoxicillin",
        "capsule",
        "500mg",
        requires_prescription,
        20,
        80,
    )
    .unwrap();
    engine.add_medicine(medicine, &actor()).unwrap()
}

fn add_supplier(engine: &Engine<FixedClock>, name: &str) -> SupplierId {
    let supplier = Supplier::new(SupplierId::new(), name, ContactInfo::default()).unwrap();
    engine.add_supplier(supplier, &actor()).unwrap()
}

fn receive_batch(
    engine: &Engine<FixedClock>,
    medicine_id: MedicineId,
    supplier_id: SupplierId,
    number: &str,
    quantity: i64,
    expiry_date: NaiveDate,
) -> BatchId {
    engine
        .receive(
            BatchSpec {
                medicine_id,
                supplier_id,
                batch_number: number.to_string(),
                quantity,
                cost_price: 250,
                selling_price: 400,
                manufacture_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                expiry_date,
            },
            None,
            &actor(),
        )
        .unwrap()
}

fn far_expiry() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

/// A batch a year from expiry with 100 units on hand.
fn stocked_batch(engine: &Engine<FixedClock>, requires_prescription: bool) -> (MedicineId, BatchId) {
    let medicine_id = add_medicine(engine, requires_prescription);
    let supplier_id = add_supplier(engine, "MedSupply GmbH");
    let batch_id = receive_batch(engine, medicine_id, supplier_id, "LOT-1", 100, far_expiry());
    (medicine_id, batch_id)
}

fn sale_request(batch_id: BatchId, quantity: i64) -> SaleRequest {
    SaleRequest {
        batch_id,
        quantity,
        unit_price: 400,
        prescription_id: None,
        customer: CustomerInfo {
            name: "walk-in".to_string(),
            contact: None,
        },
        payment: PaymentMethod::Cash,
    }
}

#[test]
fn record_sale_decrements_stock_and_appends_movement() {
    let engine = setup();
    let (_, batch_id) = stocked_batch(&engine, false);

    let sale_id = engine
        .record_sale(&sale_request(batch_id, 25), &actor())
        .unwrap();

    let batch = engine.get_batch(batch_id).unwrap();
    assert_eq!(batch.quantity, 75);

    let sale = engine.get_sale(sale_id).unwrap();
    assert_eq!(sale.quantity_sold, 25);
    assert_eq!(sale.total_amount, 25 * 400);

    let movements = engine.movements_for(batch_id).unwrap();
    assert_eq!(movements.len(), 2);
    assert_eq!(movements[0].kind, MovementKind::Purchase);
    assert_eq!(movements[0].delta, 100);
    assert_eq!(movements[1].kind, MovementKind::Sale);
    assert_eq!(movements[1].delta, -25);
}

#[test]
fn sale_at_reorder_point_raises_medium_alert() {
    // reorder_point = 80: selling 25 of 100 leaves 75, inside the band but
    // above the half point, so the alert is medium and nothing is ordered.
    let engine = setup();
    let (_, batch_id) = stocked_batch(&engine, false);

    engine
        .record_sale(&sale_request(batch_id, 25), &actor())
        .unwrap();

    let alerts = engine.alerts_for_batch(batch_id).unwrap();
    let reorder: Vec<_> = alerts
        .iter()
        .filter(|a| a.alert_type == AlertType::Reorder)
        .collect();
    assert_eq!(reorder.len(), 1);
    assert_eq!(reorder[0].severity, Severity::Medium);
}

#[test]
fn prescription_gate_fails_without_active_prescription() {
    let engine = setup();
    let (_, batch_id) = stocked_batch(&engine, true);

    let err = engine
        .record_sale(&sale_request(batch_id, 5), &actor())
        .unwrap_err();
    assert_eq!(err, EngineError::PrescriptionRequired);

    // No partial effect: quantity, movements, alerts and audit are as
    // after receipt.
    assert_eq!(engine.get_batch(batch_id).unwrap().quantity, 100);
    assert_eq!(engine.movements_for(batch_id).unwrap().len(), 1);
    assert!(engine.unacknowledged_alerts().unwrap().is_empty());
    assert!(
        engine
            .audit_trail()
            .unwrap()
            .iter()
            .all(|e| e.entity != "sale")
    );
}

#[test]
fn prescription_gate_accepts_only_active_prescriptions() {
    let engine = setup();
    let (_, batch_id) = stocked_batch(&engine, true);

    let prescription = Prescription::new(
        apotheca_core::PrescriptionId::new(),
        "Jane Roe",
        "Dr. Okafor",
        today(),
    );
    let prescription_id = engine.add_prescription(prescription, &actor()).unwrap();

    let mut request = sale_request(batch_id, 5);
    request.prescription_id = Some(prescription_id);
    engine.record_sale(&request, &actor()).unwrap();

    // Once the issuer reports it expired, the gate closes again.
    engine
        .update_prescription_status(prescription_id, PrescriptionStatus::Expired, &actor())
        .unwrap();
    let err = engine.record_sale(&request, &actor()).unwrap_err();
    assert_eq!(err, EngineError::PrescriptionRequired);
}

#[test]
fn recalled_batch_refuses_sale_first() {
    let engine = setup();
    let (_, batch_id) = stocked_batch(&engine, true);

    engine
        .add_recall(
            &RecallRequest {
                batch_id,
                reason: "contamination".to_string(),
                announced_on: today(),
                announced_by: "manufacturer".to_string(),
                severity: Severity::Critical,
                instructions: "quarantine".to_string(),
            },
            &actor(),
        )
        .unwrap();

    // Prescription is also missing, but the recall check wins.
    let err = engine
        .record_sale(&sale_request(batch_id, 1), &actor())
        .unwrap_err();
    assert_eq!(err, EngineError::RecalledOrExpired);
}

#[test]
fn oversell_is_refused_with_quantities() {
    let engine = setup();
    let (_, batch_id) = stocked_batch(&engine, false);

    let err = engine
        .record_sale(&sale_request(batch_id, 101), &actor())
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientStock {
            batch_id,
            requested: 101,
            available: 100,
        }
    );
    assert_eq!(engine.get_batch(batch_id).unwrap().quantity, 100);
}

#[test]
fn expire_sweep_is_idempotent() {
    let engine = setup();
    let medicine_id = add_medicine(&engine, false);
    let supplier_id = add_supplier(&engine, "MedSupply GmbH");

    let past = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let gone_a = receive_batch(&engine, medicine_id, supplier_id, "OLD-1", 10, past);
    let gone_b = receive_batch(&engine, medicine_id, supplier_id, "OLD-2", 10, past);
    let fresh = receive_batch(&engine, medicine_id, supplier_id, "NEW-1", 10, far_expiry());

    assert_eq!(engine.expire_sweep(today(), &actor()).unwrap(), 2);
    assert!(engine.get_batch(gone_a).unwrap().is_expired);
    assert!(engine.get_batch(gone_b).unwrap().is_expired);
    assert!(!engine.get_batch(fresh).unwrap().is_expired);

    // Second sweep with the same date mutates nothing.
    assert_eq!(engine.expire_sweep(today(), &actor()).unwrap(), 0);
}

#[test]
fn receipt_time_expiry_alerts_are_banded() {
    let engine = setup();
    let medicine_id = add_medicine(&engine, false);
    let supplier_id = add_supplier(&engine, "MedSupply GmbH");

    let cases = [
        ("SHORT-5", 5i64, Some(Severity::Critical)),
        ("SHORT-20", 20, Some(Severity::High)),
        ("SHORT-60", 60, Some(Severity::Medium)),
        ("LONG-120", 120, None),
    ];

    for (number, days, expected) in cases {
        let batch_id = receive_batch(
            &engine,
            medicine_id,
            supplier_id,
            number,
            10,
            today() + chrono::Duration::days(days),
        );
        let expiry_alerts: Vec<_> = engine
            .alerts_for_batch(batch_id)
            .unwrap()
            .into_iter()
            .filter(|a| a.alert_type == AlertType::Expiry)
            .collect();
        match expected {
            Some(severity) => {
                assert_eq!(expiry_alerts.len(), 1, "batch {number}");
                assert_eq!(expiry_alerts[0].severity, severity, "batch {number}");
            }
            None => assert!(expiry_alerts.is_empty(), "batch {number}"),
        }
    }
}

#[test]
fn raise_alert_dedups_until_acknowledged() {
    let engine = setup();
    let (_, batch_id) = stocked_batch(&engine, false);

    let first = engine
        .raise_alert(batch_id, AlertType::LowStock, Severity::Medium, "low")
        .unwrap();
    assert!(first.is_raised());

    let second = engine
        .raise_alert(batch_id, AlertType::LowStock, Severity::Medium, "still low")
        .unwrap();
    assert!(!second.is_raised());
    assert_eq!(second.alert_id(), first.alert_id());

    // Exactly one row exists.
    let low_stock: Vec<_> = engine
        .alerts_for_batch(batch_id)
        .unwrap()
        .into_iter()
        .filter(|a| a.alert_type == AlertType::LowStock)
        .collect();
    assert_eq!(low_stock.len(), 1);

    // Acknowledgement frees the dedup key.
    engine
        .acknowledge_alert(first.alert_id(), &actor(), Some("reordered".to_string()))
        .unwrap();
    let third = engine
        .raise_alert(batch_id, AlertType::LowStock, Severity::Medium, "low again")
        .unwrap();
    assert!(third.is_raised());
}

#[test]
fn acknowledge_is_exactly_once() {
    let engine = setup();
    let (_, batch_id) = stocked_batch(&engine, false);
    let outcome = engine
        .raise_alert(batch_id, AlertType::LowStock, Severity::Low, "low")
        .unwrap();

    engine
        .acknowledge_alert(outcome.alert_id(), &actor(), None)
        .unwrap();
    let err = engine
        .acknowledge_alert(outcome.alert_id(), &actor(), None)
        .unwrap_err();
    assert_eq!(err, EngineError::AlreadyAcknowledged);
}

#[test]
fn scan_expiring_bands_and_dedups() {
    let engine = setup();
    let medicine_id = add_medicine(&engine, false);
    let supplier_id = add_supplier(&engine, "MedSupply GmbH");

    // Both batches expire beyond the 90-day receipt watch horizon, so
    // receipt raised nothing; a 100-day scan catches only the closer one.
    let close = receive_batch(
        &engine,
        medicine_id,
        supplier_id,
        "SCAN-95",
        10,
        today() + chrono::Duration::days(95),
    );
    let far = receive_batch(
        &engine,
        medicine_id,
        supplier_id,
        "SCAN-150",
        10,
        today() + chrono::Duration::days(150),
    );

    let raised = engine.scan_expiring(100).unwrap();
    assert_eq!(raised.len(), 1);
    let alert = engine.get_alert(raised[0]).unwrap();
    assert_eq!(alert.batch_id, close);
    assert_eq!(alert.severity, Severity::Low);

    // Re-scan raises nothing while the alert is unacknowledged.
    assert!(engine.scan_expiring(100).unwrap().is_empty());
    assert!(engine.alerts_for_batch(far).unwrap().is_empty());
}

#[test]
fn recall_disposes_stock_and_always_alerts() {
    let engine = setup();
    let (_, batch_id) = stocked_batch(&engine, false);
    engine
        .record_sale(&sale_request(batch_id, 50), &actor())
        .unwrap();

    let request = RecallRequest {
        batch_id,
        reason: "contamination".to_string(),
        announced_on: today(),
        announced_by: "manufacturer".to_string(),
        severity: Severity::Critical,
        instructions: "quarantine and return".to_string(),
    };
    let recall_id = engine.add_recall(&request, &actor()).unwrap();

    let recall = engine.get_recall(recall_id).unwrap();
    assert_eq!(recall.affected_quantity, 50);
    assert_eq!(recall.status, RecallStatus::Active);

    let batch = engine.get_batch(batch_id).unwrap();
    assert!(batch.is_recalled);
    assert_eq!(batch.quantity, 0);

    let movements = engine.movements_for(batch_id).unwrap();
    let disposal: Vec<_> = movements
        .iter()
        .filter(|m| m.kind == MovementKind::Disposal)
        .collect();
    assert_eq!(disposal.len(), 1);
    assert_eq!(disposal[0].delta, -50);

    // A second recall event alerts again even though the first recall
    // alert is still unacknowledged.
    let mut second = request.clone();
    second.reason = "expanded recall".to_string();
    engine.add_recall(&second, &actor()).unwrap();

    let recall_alerts: Vec<_> = engine
        .alerts_for_batch(batch_id)
        .unwrap()
        .into_iter()
        .filter(|a| a.alert_type == AlertType::Recall)
        .collect();
    assert_eq!(recall_alerts.len(), 2);
    assert!(recall_alerts.iter().all(|a| a.severity == Severity::Critical));
    assert!(recall_alerts.iter().all(|a| !a.is_acknowledged));
}

#[test]
fn recall_status_closes_once() {
    let engine = setup();
    let (_, batch_id) = stocked_batch(&engine, false);
    let recall_id = engine
        .add_recall(
            &RecallRequest {
                batch_id,
                reason: "labelling defect".to_string(),
                announced_on: today(),
                announced_by: "regulator".to_string(),
                severity: Severity::High,
                instructions: "return to supplier".to_string(),
            },
            &actor(),
        )
        .unwrap();

    engine
        .update_recall_status(recall_id, RecallStatus::Resolved, &actor())
        .unwrap();
    let err = engine
        .update_recall_status(recall_id, RecallStatus::Cancelled, &actor())
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[test]
fn concurrent_oversell_exactly_one_succeeds() {
    let engine = Arc::new(setup());
    let (_, batch_id) = stocked_batch(&engine, false);

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let engine = Arc::clone(&engine);
                scope.spawn(move || engine.record_sale(&sale_request(batch_id, 60), &actor()))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of two oversubscribing sales wins");
    for result in &results {
        if let Err(err) = result {
            assert!(
                matches!(
                    err,
                    EngineError::InsufficientStock { .. } | EngineError::ConcurrencyConflict
                ),
                "unexpected error: {err:?}"
            );
        }
    }

    let batch = engine.get_batch(batch_id).unwrap();
    assert_eq!(batch.quantity, 40);

    let sold: i64 = engine
        .movements_for(batch_id)
        .unwrap()
        .iter()
        .filter(|m| m.kind == MovementKind::Sale)
        .map(|m| -m.delta)
        .sum();
    assert_eq!(sold, 60);
}

#[test]
fn concurrent_sales_never_oversell_in_aggregate() {
    let engine = Arc::new(setup());
    let (_, batch_id) = stocked_batch(&engine, false);

    // 100 units, 8 threads x 3 sales of 7 = 168 requested.
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                scope.spawn(move || {
                    let mut outcomes = Vec::new();
                    for _ in 0..3 {
                        outcomes.push(engine.record_sale(&sale_request(batch_id, 7), &actor()));
                    }
                    outcomes
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let sold = results.iter().filter(|r| r.is_ok()).count() as i64 * 7;
    let batch = engine.get_batch(batch_id).unwrap();
    assert!(sold <= 100);
    assert_eq!(batch.quantity, 100 - sold);
}

#[test]
fn auto_order_opens_below_half_point() {
    let engine = setup();
    let medicine_id = add_medicine(&engine, false);
    let supplier_id = add_supplier(&engine, "MedSupply GmbH");
    let batch_id = receive_batch(&engine, medicine_id, supplier_id, "LOT-1", 100, far_expiry());

    // 100 - 61 = 39 <= 40: high reorder alert + auto order.
    engine
        .record_sale(&sale_request(batch_id, 61), &actor())
        .unwrap();

    let reorder: Vec<_> = engine
        .alerts_for_batch(batch_id)
        .unwrap()
        .into_iter()
        .filter(|a| a.alert_type == AlertType::Reorder)
        .collect();
    assert_eq!(reorder.len(), 1);
    assert_eq!(reorder[0].severity, Severity::High);

    let order_id = engine.auto_order(medicine_id, &actor()).unwrap();
    let order = engine.get_order(order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.auto_generated);
    assert_eq!(order.supplier_id, supplier_id);
    // No forecast: the policy default.
    assert_eq!(order.quantity, 100);
    assert_eq!(order.expected_delivery, today() + chrono::Duration::days(7));

    // The sale already opened today's order, so this was idempotent.
    let performance = engine.supplier_performance(supplier_id).unwrap();
    assert_eq!(performance.open_orders, 1);
}

#[test]
fn selling_out_raises_critical_and_out_of_stock() {
    let engine = setup();
    let (_, batch_id) = stocked_batch(&engine, false);

    engine
        .record_sale(&sale_request(batch_id, 100), &actor())
        .unwrap();

    let alerts = engine.alerts_for_batch(batch_id).unwrap();
    let reorder = alerts
        .iter()
        .find(|a| a.alert_type == AlertType::Reorder)
        .unwrap();
    assert_eq!(reorder.severity, Severity::Critical);
    assert!(
        alerts
            .iter()
            .any(|a| a.alert_type == AlertType::OutOfStock && a.severity == Severity::Critical)
    );
}

#[test]
fn auto_order_sizes_from_latest_future_forecast() {
    let engine = setup();
    let medicine_id = add_medicine(&engine, false);
    add_supplier(&engine, "MedSupply GmbH");

    for (days, quantity) in [(-10i64, 500), (20, 130), (45, 90)] {
        engine
            .ingest_forecast(PredictedDemand {
                medicine_id,
                date: today() + chrono::Duration::days(days),
                quantity,
            })
            .unwrap();
    }

    let order_id = engine.auto_order(medicine_id, &actor()).unwrap();
    assert_eq!(engine.get_order(order_id).unwrap().quantity, 90);
}

#[test]
fn auto_order_is_idempotent_per_day() {
    let engine = setup();
    let medicine_id = add_medicine(&engine, false);
    add_supplier(&engine, "MedSupply GmbH");

    let first = engine.auto_order(medicine_id, &actor()).unwrap();
    let second = engine.auto_order(medicine_id, &actor()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn auto_order_picks_best_supplier() {
    let engine = setup();
    let medicine_id = add_medicine(&engine, false);
    let best = add_supplier(&engine, "TopRated Pharma");
    let suspended = add_supplier(&engine, "Banned Ltd");
    engine.suspend_supplier(suspended, &actor()).unwrap();

    // Give "best" a rating while it is the only active supplier.
    let seeded_order = engine.auto_order(medicine_id, &actor()).unwrap();
    engine
        .rate_supplier(best, seeded_order, 5, 5, 5, None, &actor())
        .unwrap();

    // A rated supplier beats a fresh unrated one; suspended never wins.
    add_supplier(&engine, "Unrated & Sons");
    let other_medicine = add_medicine(&engine, false);
    let order_id = engine.auto_order(other_medicine, &actor()).unwrap();
    assert_eq!(engine.get_order(order_id).unwrap().supplier_id, best);
}

#[test]
fn no_eligible_supplier_surfaces_only_on_direct_auto_order() {
    let engine = setup();
    let medicine_id = add_medicine(&engine, false);
    let supplier_id = add_supplier(&engine, "MedSupply GmbH");
    let batch_id = receive_batch(&engine, medicine_id, supplier_id, "LOT-1", 100, far_expiry());
    engine.suspend_supplier(supplier_id, &actor()).unwrap();

    // The sale crosses the half point, procurement finds nobody, the sale
    // still commits.
    engine
        .record_sale(&sale_request(batch_id, 61), &actor())
        .unwrap();
    assert_eq!(engine.get_batch(batch_id).unwrap().quantity, 39);

    let err = engine.auto_order(medicine_id, &actor()).unwrap_err();
    assert_eq!(err, EngineError::NoEligibleSupplier);
}

#[test]
fn rate_supplier_folds_running_mean() {
    let engine = setup();
    let medicine_id = add_medicine(&engine, false);
    let supplier_id = add_supplier(&engine, "MedSupply GmbH");

    let order_id = engine.auto_order(medicine_id, &actor()).unwrap();
    engine
        .rate_supplier(supplier_id, order_id, 4, 5, 3, None, &actor())
        .unwrap();

    let second_medicine = add_medicine(&engine, false);
    let second_order = engine.auto_order(second_medicine, &actor()).unwrap();
    engine
        .rate_supplier(supplier_id, second_order, 2, 2, 2, Some("late".to_string()), &actor())
        .unwrap();

    let performance = engine.supplier_performance(supplier_id).unwrap();
    assert_eq!(performance.rating, Some(3.0));
    assert_eq!(performance.total_orders, 2);
}

#[test]
fn delivery_updates_on_time_rate() {
    let engine = setup();
    let medicine_id = add_medicine(&engine, false);
    let supplier_id = add_supplier(&engine, "MedSupply GmbH");

    let order_id = engine.auto_order(medicine_id, &actor()).unwrap();
    engine
        .set_order_status(order_id, OrderStatus::Approved, &actor())
        .unwrap();
    engine
        .set_order_status(order_id, OrderStatus::Shipped, &actor())
        .unwrap();
    // Delivered "today", expected today+7: on time.
    engine
        .set_order_status(order_id, OrderStatus::Delivered, &actor())
        .unwrap();

    let performance = engine.supplier_performance(supplier_id).unwrap();
    assert_eq!(performance.on_time_delivery_rate, Some(100.0));
    assert_eq!(performance.delivered_orders, 1);

    // Backwards and post-terminal transitions stay refused.
    let err = engine
        .set_order_status(order_id, OrderStatus::Shipped, &actor())
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[test]
fn referential_rules_restrict_and_cascade() {
    let engine = setup();
    let medicine_id = add_medicine(&engine, false);
    let supplier_id = add_supplier(&engine, "MedSupply GmbH");
    let batch_id = receive_batch(&engine, medicine_id, supplier_id, "LOT-1", 100, far_expiry());
    engine
        .raise_alert(batch_id, AlertType::LowStock, Severity::Low, "low")
        .unwrap();

    // Medicine removal is RESTRICTed while the batch exists.
    let err = engine.remove_medicine(medicine_id, &actor()).unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // A sale RESTRICTs batch removal.
    engine
        .record_sale(&sale_request(batch_id, 10), &actor())
        .unwrap();
    let err = engine.remove_batch(batch_id, &actor()).unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // A sale-free batch cascades its alerts and movements away.
    let second = receive_batch(&engine, medicine_id, supplier_id, "LOT-2", 50, far_expiry());
    engine
        .raise_alert(second, AlertType::LowStock, Severity::Low, "low")
        .unwrap();
    engine.remove_batch(second, &actor()).unwrap();
    assert!(engine.alerts_for_batch(second).unwrap().is_empty());
    assert!(engine.movements_for(second).unwrap().is_empty());
    assert!(engine.get_batch(second).is_err());
}

#[test]
fn batch_status_priority_most_severe_wins() {
    let engine = setup();
    let medicine_id = add_medicine(&engine, false);
    let supplier_id = add_supplier(&engine, "MedSupply GmbH");

    // Expired (past date), low (0 < 20) and finally recalled: RECALLED wins.
    let past = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let batch_id = receive_batch(&engine, medicine_id, supplier_id, "OLD-1", 10, past);
    assert_eq!(
        engine.batch_status(batch_id).unwrap(),
        BatchStatus::Expired
    );

    engine
        .add_recall(
            &RecallRequest {
                batch_id,
                reason: "defect".to_string(),
                announced_on: today(),
                announced_by: "manufacturer".to_string(),
                severity: Severity::High,
                instructions: "discard".to_string(),
            },
            &actor(),
        )
        .unwrap();
    assert_eq!(
        engine.batch_status(batch_id).unwrap(),
        BatchStatus::Recalled
    );

    // Within 7 days: critical expiry outranks low stock.
    let soon = receive_batch(
        &engine,
        medicine_id,
        supplier_id,
        "SOON-1",
        5,
        today() + chrono::Duration::days(3),
    );
    assert_eq!(
        engine.batch_status(soon).unwrap(),
        BatchStatus::CriticalExpiry
    );

    // Healthy stock far from expiry.
    let fine = receive_batch(&engine, medicine_id, supplier_id, "FINE-1", 100, far_expiry());
    assert_eq!(engine.batch_status(fine).unwrap(), BatchStatus::Ok);

    // Low quantity alone.
    let low = receive_batch(&engine, medicine_id, supplier_id, "LOW-1", 5, far_expiry());
    assert_eq!(engine.batch_status(low).unwrap(), BatchStatus::LowStock);
}

#[test]
fn unacknowledged_alerts_order_by_severity_then_recency() {
    let engine = setup();
    let medicine_id = add_medicine(&engine, false);
    let supplier_id = add_supplier(&engine, "MedSupply GmbH");
    let a = receive_batch(&engine, medicine_id, supplier_id, "A", 100, far_expiry());
    let b = receive_batch(&engine, medicine_id, supplier_id, "B", 100, far_expiry());

    engine
        .raise_alert(a, AlertType::LowStock, Severity::Low, "low")
        .unwrap();
    let critical = engine
        .raise_alert(b, AlertType::OutOfStock, Severity::Critical, "gone")
        .unwrap();
    engine
        .raise_alert(a, AlertType::Expiry, Severity::Medium, "expiring")
        .unwrap();

    let alerts = engine.unacknowledged_alerts().unwrap();
    assert_eq!(alerts.len(), 3);
    assert_eq!(alerts[0].id, critical.alert_id());
    assert_eq!(alerts[1].severity, Severity::Medium);
    assert_eq!(alerts[2].severity, Severity::Low);
}

#[test]
fn medicine_rollup_aggregates_stock_and_trailing_sales() {
    let engine = setup();
    let medicine_id = add_medicine(&engine, false);
    let supplier_id = add_supplier(&engine, "MedSupply GmbH");
    let a = receive_batch(&engine, medicine_id, supplier_id, "A", 100, far_expiry());
    receive_batch(
        &engine,
        medicine_id,
        supplier_id,
        "B",
        30,
        today() + chrono::Duration::days(20),
    );

    engine
        .record_sale(&sale_request(a, 25), &actor())
        .unwrap();

    let rollup = engine.medicine_rollup(medicine_id).unwrap();
    assert_eq!(rollup.total_stock, 105);
    assert_eq!(rollup.near_expiry_batches, 1);
    assert_eq!(rollup.recalled_batches, 0);
    assert_eq!(rollup.units_sold_30d, 25);
    assert_eq!(rollup.revenue_30d, 25 * 400);
    assert!(!rollup.needs_reorder);
}

#[test]
fn audit_trail_captures_before_and_after_images() {
    let engine = setup();
    let (_, batch_id) = stocked_batch(&engine, false);
    engine
        .record_sale(&sale_request(batch_id, 25), &actor())
        .unwrap();

    let trail = engine.audit_trail().unwrap();
    let batch_updates: Vec<_> = trail
        .iter()
        .filter(|e| e.entity == "batch" && e.action == AuditAction::Update)
        .collect();
    assert_eq!(batch_updates.len(), 1);

    let entry = batch_updates[0];
    assert_eq!(entry.record_id, batch_id.to_string());
    assert_eq!(entry.before.as_ref().unwrap()["quantity"], 100);
    assert_eq!(entry.after.as_ref().unwrap()["quantity"], 75);

    assert!(
        trail
            .iter()
            .any(|e| e.entity == "sale" && e.action == AuditAction::Create)
    );
}

#[test]
fn deactivated_medicine_refuses_receipt() {
    let engine = setup();
    let medicine_id = add_medicine(&engine, false);
    let supplier_id = add_supplier(&engine, "MedSupply GmbH");
    engine.deactivate_medicine(medicine_id, &actor()).unwrap();

    let err = engine
        .receive(
            BatchSpec {
                medicine_id,
                supplier_id,
                batch_number: "LOT-X".to_string(),
                quantity: 10,
                cost_price: 100,
                selling_price: 150,
                manufacture_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                expiry_date: far_expiry(),
            },
            None,
            &actor(),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Conservation: for any sequence of sales followed by an optional
    /// recall, initial quantity = remaining + sold + disposed.
    #[test]
    fn quantity_is_conserved(
        quantities in proptest::collection::vec(1i64..40, 1..12),
        recall_at_end in proptest::bool::ANY,
    ) {
        let engine = setup();
        let (_, batch_id) = stocked_batch(&engine, false);

        let mut sold = 0i64;
        for quantity in quantities {
            if engine
                .record_sale(&sale_request(batch_id, quantity), &actor())
                .is_ok()
            {
                sold += quantity;
            }
        }

        let mut disposed = 0i64;
        if recall_at_end {
            let recall_id = engine
                .add_recall(
                    &RecallRequest {
                        batch_id,
                        reason: "test recall".to_string(),
                        announced_on: today(),
                        announced_by: "manufacturer".to_string(),
                        severity: Severity::High,
                        instructions: "discard".to_string(),
                    },
                    &actor(),
                )
                .unwrap();
            disposed = engine.get_recall(recall_id).unwrap().affected_quantity;
        }

        let batch = engine.get_batch(batch_id).unwrap();
        prop_assert!(sold <= 100);
        prop_assert_eq!(batch.quantity + sold + disposed, 100);
        if recall_at_end {
            prop_assert_eq!(batch.quantity, 0);
        }
    }
}
