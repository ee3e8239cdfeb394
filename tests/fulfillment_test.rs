//! Order-to-inventory resolution and clamped stock deduction.

mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use chrono::Utc;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use common::{read_json, TestApp};
use stockbook_api::errors::ServiceError;
use stockbook_api::services::fulfillment::ApplyFulfillmentRequest;

fn apply_all() -> ApplyFulfillmentRequest {
    ApplyFulfillmentRequest { order_ids: None }
}

fn apply_only(ids: Vec<Uuid>) -> ApplyFulfillmentRequest {
    ApplyFulfillmentRequest {
        order_ids: Some(ids),
    }
}

#[tokio::test]
async fn mapping_resolution_wins_over_direct_items() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let part = app
        .seed_item(tenant, "PART-KIT", "Kit Part", dec!(1.00), 50)
        .await;
    // A catalog item that shares the mapping's SKU must not be touched.
    let decoy = app
        .seed_item(tenant, "COMBO-7", "Combo Box", dec!(5.00), 10)
        .await;
    app.seed_mapping(tenant, "COMBO-7", dec!(0.20), &[(part.id, 3)])
        .await;

    let order = app
        .seed_order(tenant, "ORD-1", Utc::now(), &[("COMBO-7", 2)])
        .await;
    let outcome = app
        .state
        .services
        .fulfillment
        .resolve_and_apply(tenant, apply_all())
        .await
        .expect("fulfillment should run");

    assert_eq!(outcome.applied_orders, vec![order]);
    assert!(outcome.unresolved.is_empty());
    assert!(outcome.shortfalls.is_empty());
    assert_eq!(outcome.stock_changes.len(), 1);
    assert_eq!(outcome.stock_changes[0].item_id, part.id);
    assert_eq!(outcome.stock_changes[0].delta, -6);
    assert_eq!(outcome.stock_changes[0].reason, "order-fulfillment");
    assert_eq!(outcome.stock_changes[0].note, None);

    let inventory = &app.state.services.inventory;
    let part = inventory
        .get_item(tenant, part.id)
        .await
        .expect("part should load");
    assert_eq!(part.quantity_on_hand, 44);
    let decoy = inventory
        .get_item(tenant, decoy.id)
        .await
        .expect("decoy should load");
    assert_eq!(decoy.quantity_on_hand, 10);
}

#[tokio::test]
async fn empty_mappings_fall_through_to_direct_items() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let item = app
        .seed_item(tenant, "BARE", "Bare Item", dec!(2.00), 8)
        .await;
    app.seed_mapping(tenant, "BARE", dec!(0.10), &[]).await;

    app.seed_order(tenant, "ORD-BARE", Utc::now(), &[("BARE", 3)])
        .await;
    let outcome = app
        .state
        .services
        .fulfillment
        .resolve_and_apply(tenant, apply_all())
        .await
        .expect("fulfillment should run");

    assert_eq!(outcome.stock_changes.len(), 1);
    assert_eq!(outcome.stock_changes[0].item_id, item.id);
    assert_eq!(outcome.stock_changes[0].new_quantity, 5);
}

#[tokio::test]
async fn direct_items_match_by_sku_before_name() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let by_name = app
        .seed_item(tenant, "ALPHA", "Blue Widget", dec!(1.00), 9)
        .await;
    let by_sku = app
        .seed_item(tenant, "Blue Widget", "Display Model", dec!(1.00), 4)
        .await;

    app.seed_order(tenant, "ORD-NAME", Utc::now(), &[("Blue Widget", 1)])
        .await;
    app.state
        .services
        .fulfillment
        .resolve_and_apply(tenant, apply_all())
        .await
        .expect("fulfillment should run");

    let inventory = &app.state.services.inventory;
    assert_eq!(
        inventory
            .get_item(tenant, by_sku.id)
            .await
            .expect("sku match should load")
            .quantity_on_hand,
        3
    );
    assert_eq!(
        inventory
            .get_item(tenant, by_name.id)
            .await
            .expect("name match should load")
            .quantity_on_hand,
        9
    );
}

#[tokio::test]
async fn name_matches_cover_marketplace_exports() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let item = app
        .seed_item(tenant, "SKU-9", "Red Scarf", dec!(2.00), 6)
        .await;

    // Marketplace files often carry the product title where the SKU
    // should be.
    app.seed_order(tenant, "ORD-TITLE", Utc::now(), &[("Red Scarf", 2)])
        .await;
    let outcome = app
        .state
        .services
        .fulfillment
        .resolve_and_apply(tenant, apply_all())
        .await
        .expect("fulfillment should run");

    assert!(outcome.unresolved.is_empty());
    assert_eq!(
        app.state
            .services
            .inventory
            .get_item(tenant, item.id)
            .await
            .expect("item should load")
            .quantity_on_hand,
        4
    );
}

#[tokio::test]
async fn deductions_coalesce_into_one_record_per_item() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let item = app
        .seed_item(tenant, "ITEM-I", "Shared Part", dec!(1.00), 20)
        .await;
    app.seed_mapping(tenant, "KIT-M", dec!(0.10), &[(item.id, 2)])
        .await;

    app.seed_order(tenant, "ORD-A", Utc::now(), &[("KIT-M", 2)])
        .await;
    app.seed_order(
        tenant,
        "ORD-B",
        Utc::now(),
        &[("KIT-M", 1), ("ITEM-I", 2)],
    )
    .await;

    let outcome = app
        .state
        .services
        .fulfillment
        .resolve_and_apply(tenant, apply_all())
        .await
        .expect("fulfillment should run");

    assert_eq!(outcome.applied_orders.len(), 2);
    // 2*2 + 1*2 from the mapping plus 2 direct, in a single ledger row.
    assert_eq!(outcome.stock_changes.len(), 1);
    assert_eq!(outcome.stock_changes[0].delta, -8);
    assert_eq!(outcome.stock_changes[0].previous_quantity, 20);
    assert_eq!(outcome.stock_changes[0].new_quantity, 12);
}

#[tokio::test]
async fn oversold_batches_clamp_at_the_default_floor() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let item = app
        .seed_item(tenant, "ITEM-LOW", "Low Stock", dec!(1.00), 3)
        .await;

    let order = app
        .seed_order(tenant, "ORD-OVER", Utc::now(), &[("ITEM-LOW", 5)])
        .await;
    let outcome = app
        .state
        .services
        .fulfillment
        .resolve_and_apply(tenant, apply_all())
        .await
        .expect("fulfillment should run");

    // The order still completes; the ledger records what was actually taken.
    assert_eq!(outcome.applied_orders, vec![order]);
    assert_eq!(outcome.stock_changes[0].delta, -3);
    assert_eq!(outcome.stock_changes[0].new_quantity, 0);
    assert!(outcome.stock_changes[0]
        .note
        .as_deref()
        .is_some_and(|n| n.contains("clamped at stock floor 0")));

    assert_eq!(outcome.shortfalls.len(), 1);
    let shortfall = &outcome.shortfalls[0];
    assert_eq!(shortfall.item_id, item.id);
    assert_eq!(shortfall.sku, "ITEM-LOW");
    assert_eq!(shortfall.requested, 5);
    assert_eq!(shortfall.applied, 3);
    assert_eq!(shortfall.shortfall, 2);
}

#[tokio::test]
async fn a_raised_floor_preserves_buffer_stock() {
    let app = TestApp::with_stock_floor(5).await;
    let tenant = Uuid::new_v4();
    let item = app
        .seed_item(tenant, "ITEM-BUF", "Buffered", dec!(1.00), 10)
        .await;
    // Already below the floor; nothing may be taken from it.
    let depleted = app
        .seed_item(tenant, "ITEM-DRY", "Depleted", dec!(1.00), 2)
        .await;

    app.seed_order(
        tenant,
        "ORD-BUF",
        Utc::now(),
        &[("ITEM-BUF", 9), ("ITEM-DRY", 3)],
    )
    .await;
    let outcome = app
        .state
        .services
        .fulfillment
        .resolve_and_apply(tenant, apply_all())
        .await
        .expect("fulfillment should run");

    let inventory = &app.state.services.inventory;
    assert_eq!(
        inventory
            .get_item(tenant, item.id)
            .await
            .expect("item should load")
            .quantity_on_hand,
        5
    );
    assert_eq!(
        inventory
            .get_item(tenant, depleted.id)
            .await
            .expect("item should load")
            .quantity_on_hand,
        2
    );

    assert_eq!(outcome.shortfalls.len(), 2);
    let dry = outcome
        .shortfalls
        .iter()
        .find(|s| s.item_id == depleted.id)
        .expect("depleted item should report a shortfall");
    assert_eq!(dry.applied, 0);
    assert_eq!(dry.shortfall, 3);
}

#[tokio::test]
async fn explicit_selection_skips_applied_orders_and_rejects_unknown_ids() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    app.seed_item(tenant, "ITEM-X", "X", dec!(1.00), 100).await;

    let first = app
        .seed_order(tenant, "ORD-1", Utc::now(), &[("ITEM-X", 1)])
        .await;
    let second = app
        .seed_order(tenant, "ORD-2", Utc::now(), &[("ITEM-X", 1)])
        .await;
    let fulfillment = &app.state.services.fulfillment;

    let outcome = fulfillment
        .resolve_and_apply(tenant, apply_only(vec![first]))
        .await
        .expect("first pass should run");
    assert_eq!(outcome.applied_orders, vec![first]);
    assert!(outcome.skipped_orders.is_empty());

    let outcome = fulfillment
        .resolve_and_apply(tenant, apply_only(vec![first, second]))
        .await
        .expect("second pass should run");
    assert_eq!(outcome.applied_orders, vec![second]);
    assert_eq!(outcome.skipped_orders, vec![first]);

    let missing = fulfillment
        .resolve_and_apply(tenant, apply_only(vec![Uuid::new_v4()]))
        .await;
    assert_matches!(missing, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn reruns_do_not_deduct_twice() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let item = app
        .seed_item(tenant, "ITEM-ONCE", "Once", dec!(1.00), 10)
        .await;
    app.seed_order(tenant, "ORD-ONCE", Utc::now(), &[("ITEM-ONCE", 4)])
        .await;
    let fulfillment = &app.state.services.fulfillment;

    fulfillment
        .resolve_and_apply(tenant, apply_all())
        .await
        .expect("first pass should run");
    let outcome = fulfillment
        .resolve_and_apply(tenant, apply_all())
        .await
        .expect("second pass should run");

    assert!(outcome.applied_orders.is_empty());
    assert!(outcome.stock_changes.is_empty());
    assert_eq!(
        app.state
            .services
            .inventory
            .get_item(tenant, item.id)
            .await
            .expect("item should load")
            .quantity_on_hand,
        6
    );
}

#[tokio::test]
async fn unknown_skus_are_parked_once_per_source_order() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let first = app
        .seed_order(tenant, "ORD-G1", Utc::now(), &[("GHOST-1", 1)])
        .await;
    let second = app
        .seed_order(tenant, "ORD-G2", Utc::now(), &[("GHOST-1", 2)])
        .await;
    let fulfillment = &app.state.services.fulfillment;

    for _ in 0..3 {
        let outcome = fulfillment
            .resolve_and_apply(tenant, apply_all())
            .await
            .expect("pass should run");
        assert!(outcome.applied_orders.is_empty());
        assert_eq!(outcome.unresolved.len(), 2);
    }

    // One row per (sku, source order), no matter how many reruns saw it.
    let pending = app
        .state
        .services
        .orders
        .list_unresolved(tenant)
        .await
        .expect("unresolved list should load");
    assert_eq!(pending.len(), 2);
    let sources: Vec<Uuid> = pending.iter().map(|p| p.source_order_id).collect();
    assert!(sources.contains(&first));
    assert!(sources.contains(&second));
}

#[tokio::test]
async fn mixed_orders_apply_their_known_lines() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let item = app
        .seed_item(tenant, "KNOWN", "Known", dec!(1.00), 10)
        .await;
    let order = app
        .seed_order(
            tenant,
            "ORD-MIX",
            Utc::now(),
            &[("KNOWN", 2), ("GHOST-MIX", 1)],
        )
        .await;

    let outcome = app
        .state
        .services
        .fulfillment
        .resolve_and_apply(tenant, apply_all())
        .await
        .expect("fulfillment should run");

    assert_eq!(outcome.applied_orders, vec![order]);
    assert_eq!(outcome.unresolved.len(), 1);
    assert_eq!(outcome.unresolved[0].sku, "GHOST-MIX");
    assert_eq!(
        app.state
            .services
            .inventory
            .get_item(tenant, item.id)
            .await
            .expect("item should load")
            .quantity_on_hand,
        8
    );

    // The order is closed; only the parked SKU remains.
    let unapplied = app
        .state
        .services
        .orders
        .list_unapplied(tenant)
        .await
        .expect("unapplied list should load");
    assert!(unapplied.is_empty());
}

#[tokio::test]
async fn fully_unknown_orders_wait_for_a_mapping() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let order = app
        .seed_order(tenant, "ORD-WAIT", Utc::now(), &[("KIT-LATER", 2)])
        .await;
    let fulfillment = &app.state.services.fulfillment;

    let outcome = fulfillment
        .resolve_and_apply(tenant, apply_all())
        .await
        .expect("first pass should run");
    assert!(outcome.applied_orders.is_empty());

    let unapplied = app
        .state
        .services
        .orders
        .list_unapplied(tenant)
        .await
        .expect("unapplied list should load");
    assert_eq!(unapplied.len(), 1);
    assert_eq!(unapplied[0].id, order);

    let part = app
        .seed_item(tenant, "PART-LATER", "Part", dec!(1.00), 50)
        .await;
    app.seed_mapping(tenant, "KIT-LATER", dec!(0.10), &[(part.id, 2)])
        .await;

    let outcome = fulfillment
        .resolve_and_apply(tenant, apply_all())
        .await
        .expect("second pass should run");
    assert_eq!(outcome.applied_orders, vec![order]);
    assert_eq!(
        app.state
            .services
            .inventory
            .get_item(tenant, part.id)
            .await
            .expect("part should load")
            .quantity_on_hand,
        46
    );
}

#[tokio::test]
async fn orders_without_lines_are_closed_immediately() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let order = app.seed_order(tenant, "ORD-EMPTY", Utc::now(), &[]).await;

    let outcome = app
        .state
        .services
        .fulfillment
        .resolve_and_apply(tenant, apply_all())
        .await
        .expect("fulfillment should run");

    assert_eq!(outcome.applied_orders, vec![order]);
    assert!(outcome.stock_changes.is_empty());
}

#[tokio::test]
async fn apply_endpoint_reports_the_full_outcome() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    app.seed_item(tenant, "ITEM-HTTP", "Item", dec!(1.00), 10)
        .await;
    app.seed_order(
        tenant,
        "ORD-HTTP",
        Utc::now(),
        &[("ITEM-HTTP", 2), ("GHOST-HTTP", 1)],
    )
    .await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/tenants/{tenant}/fulfillment/apply"),
            Some(json!({})),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["applied_orders"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"]["unresolved"][0]["sku"], "GHOST-HTTP");
    assert_eq!(body["data"]["stock_changes"][0]["delta"], -2);
}
