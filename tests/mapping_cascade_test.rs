//! SKU mapping lifecycle, derived costs, and cascade recalculation.

mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use common::{read_json, TestApp};
use stockbook_api::errors::ServiceError;
use stockbook_api::services::fulfillment::ApplyFulfillmentRequest;
use stockbook_api::services::inventory::ChangeCostRequest;
use stockbook_api::services::mappings::{
    ComponentInput, CreateMappingRequest, UpdateMappingRequest,
};

#[tokio::test]
async fn creating_a_mapping_derives_cost_from_components() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let fabric = app
        .seed_item(tenant, "PART-FABRIC", "Fabric Panel", dec!(2.00), 100)
        .await;
    let zipper = app
        .seed_item(tenant, "PART-ZIP", "Zipper", dec!(3.50), 100)
        .await;

    let outcome = app
        .seed_mapping(
            tenant,
            "KIT-TOTE",
            dec!(0.75),
            &[(fabric.id, 2), (zipper.id, 1)],
        )
        .await;

    assert_eq!(outcome.mapping.manufacturing_cost, dec!(7.50));
    assert_eq!(outcome.mapping.packaging_cost, dec!(0.75));
    assert_eq!(outcome.mapping.total_unit_cost, dec!(8.25));
    assert_eq!(outcome.unresolved_resolved, 0);

    let detail = app
        .state
        .services
        .mappings
        .get_mapping(tenant, outcome.mapping.id)
        .await
        .expect("detail should load");
    assert_eq!(detail.components.len(), 2);
    assert_eq!(detail.snapshots.len(), 1);
    assert_eq!(detail.snapshots[0].manufacturing_cost, dec!(7.50));
    assert_eq!(detail.snapshots[0].total_unit_cost, dec!(8.25));
}

#[tokio::test]
async fn packaging_only_mappings_are_allowed() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();

    let outcome = app
        .seed_mapping(tenant, "KIT-DROPSHIP", dec!(1.20), &[])
        .await;

    assert_eq!(outcome.mapping.manufacturing_cost, dec!(0));
    assert_eq!(outcome.mapping.total_unit_cost, dec!(1.20));
}

#[tokio::test]
async fn mapping_creation_rejects_unknown_component_items() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();

    let result = app
        .state
        .services
        .mappings
        .create_mapping(
            tenant,
            CreateMappingRequest {
                sku: "KIT-GHOST".to_string(),
                packaging_cost: dec!(0.50),
                components: vec![ComponentInput {
                    item_id: Uuid::new_v4(),
                    quantity_per_unit: 1,
                }],
            },
        )
        .await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn duplicate_component_items_are_rejected() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let part = app
        .seed_item(tenant, "PART-ONE", "Part", dec!(1.00), 10)
        .await;

    let result = app
        .state
        .services
        .mappings
        .create_mapping(
            tenant,
            CreateMappingRequest {
                sku: "KIT-DOUBLED".to_string(),
                packaging_cost: dec!(0.10),
                components: vec![
                    ComponentInput {
                        item_id: part.id,
                        quantity_per_unit: 1,
                    },
                    ComponentInput {
                        item_id: part.id,
                        quantity_per_unit: 2,
                    },
                ],
            },
        )
        .await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn mapping_skus_conflict_within_a_tenant() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    app.seed_mapping(tenant, "KIT-DUP", dec!(0.10), &[]).await;

    let result = app
        .state
        .services
        .mappings
        .create_mapping(
            tenant,
            CreateMappingRequest {
                sku: "KIT-DUP".to_string(),
                packaging_cost: dec!(0.20),
                components: vec![],
            },
        )
        .await;

    assert_matches!(result, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn cost_changes_cascade_into_referencing_mappings() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let fabric = app
        .seed_item(tenant, "PART-FABRIC", "Fabric Panel", dec!(2.00), 100)
        .await;
    let zipper = app
        .seed_item(tenant, "PART-ZIP", "Zipper", dec!(3.50), 100)
        .await;

    let tote = app
        .seed_mapping(
            tenant,
            "KIT-TOTE",
            dec!(0.75),
            &[(fabric.id, 2), (zipper.id, 1)],
        )
        .await;
    let pouch = app
        .seed_mapping(tenant, "KIT-POUCH", dec!(0.25), &[(zipper.id, 2)])
        .await;

    let outcome = app
        .state
        .services
        .inventory
        .change_cost(
            tenant,
            fabric.id,
            ChangeCostRequest {
                new_cost: dec!(2.60),
                note: None,
            },
        )
        .await
        .expect("cost change should apply");

    assert_eq!(outcome.cascade.recalculated, vec![tote.mapping.id]);
    assert!(outcome.cascade.unchanged.is_empty());
    assert!(outcome.cascade.failed.is_empty());

    let mappings = &app.state.services.mappings;
    let tote_detail = mappings
        .get_mapping(tenant, tote.mapping.id)
        .await
        .expect("tote detail should load");
    assert_eq!(tote_detail.mapping.manufacturing_cost, dec!(8.70));
    assert_eq!(tote_detail.snapshots.len(), 2);
    assert_eq!(tote_detail.snapshots[1].manufacturing_cost, dec!(8.70));

    // The pouch does not reference the changed item and keeps its history.
    let pouch_detail = mappings
        .get_mapping(tenant, pouch.mapping.id)
        .await
        .expect("pouch detail should load");
    assert_eq!(pouch_detail.mapping.manufacturing_cost, dec!(7.00));
    assert_eq!(pouch_detail.snapshots.len(), 1);
}

#[tokio::test]
async fn recalculation_skips_mappings_whose_cost_is_unchanged() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let part = app
        .seed_item(tenant, "PART-SAME", "Part", dec!(2.00), 10)
        .await;
    let mapping = app
        .seed_mapping(tenant, "KIT-SAME", dec!(0.50), &[(part.id, 3)])
        .await;

    // Re-asserting the current cost writes a ledger row but derives the same
    // mapping total, so no snapshot is appended.
    let outcome = app
        .state
        .services
        .inventory
        .change_cost(
            tenant,
            part.id,
            ChangeCostRequest {
                new_cost: dec!(2.00),
                note: Some("confirmed with supplier".to_string()),
            },
        )
        .await
        .expect("cost change should apply");

    assert_eq!(outcome.record.delta, dec!(0));
    assert!(outcome.cascade.recalculated.is_empty());
    assert_eq!(outcome.cascade.unchanged, vec![mapping.mapping.id]);

    let detail = app
        .state
        .services
        .mappings
        .get_mapping(tenant, mapping.mapping.id)
        .await
        .expect("detail should load");
    assert_eq!(detail.snapshots.len(), 1);
}

#[tokio::test]
async fn updating_a_mapping_always_records_a_snapshot() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let part = app
        .seed_item(tenant, "PART-A", "Part A", dec!(3.00), 10)
        .await;
    let other = app
        .seed_item(tenant, "PART-B", "Part B", dec!(3.50), 10)
        .await;
    let mapping = app
        .seed_mapping(tenant, "KIT-EDIT", dec!(0.75), &[(part.id, 1)])
        .await;
    let mappings = &app.state.services.mappings;

    // Even a no-op edit marks a review point in the cost history.
    let updated = mappings
        .update_mapping(
            tenant,
            mapping.mapping.id,
            UpdateMappingRequest {
                sku: None,
                packaging_cost: Some(dec!(0.75)),
                components: None,
            },
        )
        .await
        .expect("no-op update should apply");
    assert_eq!(updated.manufacturing_cost, dec!(3.00));
    assert_eq!(updated.total_unit_cost, dec!(3.75));

    let updated = mappings
        .update_mapping(
            tenant,
            mapping.mapping.id,
            UpdateMappingRequest {
                sku: None,
                packaging_cost: None,
                components: Some(vec![ComponentInput {
                    item_id: other.id,
                    quantity_per_unit: 3,
                }]),
            },
        )
        .await
        .expect("component replacement should apply");
    assert_eq!(updated.manufacturing_cost, dec!(10.50));
    assert_eq!(updated.packaging_cost, dec!(0.75));

    let detail = mappings
        .get_mapping(tenant, mapping.mapping.id)
        .await
        .expect("detail should load");
    assert_eq!(detail.components.len(), 1);
    assert_eq!(detail.components[0].item_id, other.id);
    assert_eq!(detail.snapshots.len(), 3);
    assert_eq!(detail.snapshots[2].manufacturing_cost, dec!(10.50));
}

#[tokio::test]
async fn renaming_a_mapping_conflicts_and_takes_over_parked_skus() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let part = app
        .seed_item(tenant, "PART-REN", "Part", dec!(2.00), 50)
        .await;
    let mapping = app
        .seed_mapping(tenant, "KIT-OLD-NAME", dec!(0.50), &[(part.id, 1)])
        .await;
    app.seed_mapping(tenant, "KIT-TAKEN", dec!(0.10), &[]).await;
    let mappings = &app.state.services.mappings;

    // Renaming onto a sku another mapping owns conflicts like a create.
    let conflict = mappings
        .update_mapping(
            tenant,
            mapping.mapping.id,
            UpdateMappingRequest {
                sku: Some("KIT-TAKEN".to_string()),
                packaging_cost: None,
                components: None,
            },
        )
        .await;
    assert_matches!(conflict, Err(ServiceError::Conflict(_)));

    // Park an order under the future name.
    let order = app
        .seed_order(tenant, "ORD-REN", Utc::now(), &[("KIT-NEW-NAME", 2)])
        .await;
    app.state
        .services
        .fulfillment
        .resolve_and_apply(tenant, ApplyFulfillmentRequest { order_ids: None })
        .await
        .expect("fulfillment pass should run");

    let renamed = mappings
        .update_mapping(
            tenant,
            mapping.mapping.id,
            UpdateMappingRequest {
                sku: Some("KIT-NEW-NAME".to_string()),
                packaging_cost: None,
                components: None,
            },
        )
        .await
        .expect("rename should apply");
    assert_eq!(renamed.sku, "KIT-NEW-NAME");

    // The rename closed the parked row and the next pass fulfills the order.
    assert!(app
        .state
        .services
        .orders
        .list_unresolved(tenant)
        .await
        .expect("unresolved list should load")
        .is_empty());
    let outcome = app
        .state
        .services
        .fulfillment
        .resolve_and_apply(tenant, ApplyFulfillmentRequest { order_ids: None })
        .await
        .expect("second pass should run");
    assert_eq!(outcome.applied_orders, vec![order]);
}

#[tokio::test]
async fn dangling_components_contribute_zero_after_item_deletion() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let fabric = app
        .seed_item(tenant, "PART-FABRIC", "Fabric Panel", dec!(2.00), 100)
        .await;
    let zipper = app
        .seed_item(tenant, "PART-ZIP", "Zipper", dec!(3.50), 100)
        .await;
    let mapping = app
        .seed_mapping(
            tenant,
            "KIT-TOTE",
            dec!(0.75),
            &[(fabric.id, 2), (zipper.id, 1)],
        )
        .await;
    assert_eq!(mapping.mapping.manufacturing_cost, dec!(7.50));

    app.state
        .services
        .inventory
        .delete_item(tenant, fabric.id)
        .await
        .expect("delete should succeed");

    // The next recalculation treats the missing component as free rather
    // than failing the whole mapping.
    let outcome = app
        .state
        .services
        .inventory
        .change_cost(
            tenant,
            zipper.id,
            ChangeCostRequest {
                new_cost: dec!(4.00),
                note: None,
            },
        )
        .await
        .expect("cost change should apply");
    assert_eq!(outcome.cascade.recalculated, vec![mapping.mapping.id]);

    let detail = app
        .state
        .services
        .mappings
        .get_mapping(tenant, mapping.mapping.id)
        .await
        .expect("detail should load");
    assert_eq!(detail.mapping.manufacturing_cost, dec!(4.00));
}

#[tokio::test]
async fn mapping_lifecycle_resolves_and_reopens_unknown_skus() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let part = app
        .seed_item(tenant, "PART-CORE", "Core Part", dec!(1.50), 50)
        .await;

    app.seed_order(tenant, "ORD-MYSTERY", Utc::now(), &[("KIT-MYSTERY", 2)])
        .await;
    app.state
        .services
        .fulfillment
        .resolve_and_apply(tenant, ApplyFulfillmentRequest { order_ids: None })
        .await
        .expect("fulfillment pass should run");

    let pending = app
        .state
        .services
        .orders
        .list_unresolved(tenant)
        .await
        .expect("unresolved list should load");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].sku, "KIT-MYSTERY");

    let outcome = app
        .seed_mapping(tenant, "KIT-MYSTERY", dec!(0.30), &[(part.id, 1)])
        .await;
    assert_eq!(outcome.unresolved_resolved, 1);
    assert!(app
        .state
        .services
        .orders
        .list_unresolved(tenant)
        .await
        .expect("unresolved list should load")
        .is_empty());

    let deleted = app
        .state
        .services
        .mappings
        .delete_mapping(tenant, outcome.mapping.id)
        .await
        .expect("delete should succeed");
    assert_eq!(deleted.unresolved_reopened, 1);

    let reopened = app
        .state
        .services
        .orders
        .list_unresolved(tenant)
        .await
        .expect("unresolved list should load");
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened[0].sku, "KIT-MYSTERY");
}

#[tokio::test]
async fn mapping_detail_endpoint_flattens_the_mapping() {
    let app = TestApp::new().await;
    let tenant = Uuid::new_v4();
    let part = app
        .seed_item(tenant, "PART-HTTP", "Part", dec!(2.25), 10)
        .await;
    let mapping = app
        .seed_mapping(tenant, "KIT-HTTP", dec!(0.40), &[(part.id, 2)])
        .await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/tenants/{tenant}/mappings/{}", mapping.mapping.id),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["sku"], "KIT-HTTP");
    let manufacturing: Decimal = body["data"]["manufacturing_cost"]
        .as_str()
        .expect("manufacturing cost should serialize as a string")
        .parse()
        .expect("manufacturing cost should parse");
    assert_eq!(manufacturing, dec!(4.50));
    assert_eq!(body["data"]["components"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"]["snapshots"].as_array().map(Vec::len), Some(1));
}
