//! Shared harness for the integration tests.
//!
//! Builds a fully wired application over a private in-memory SQLite database,
//! so each test gets isolated state and can exercise the service layer
//! directly or drive the HTTP surface through `tower::ServiceExt::oneshot`
//! without binding a socket.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{self, Request, Response},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use stockbook_api::{
    config::AppConfig,
    db,
    events::{self, EventSender},
    services::factory::{ServiceContainer, ServiceFactory},
    services::inventory::{CreateItemRequest, ItemResponse},
    services::mappings::{ComponentInput, CreateMappingOutcome, CreateMappingRequest},
    services::orders::{IngestLineItem, IngestOrder, IngestOrdersRequest},
    AppState,
};

pub struct TestApp {
    router: Router,
    pub state: AppState,
    event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Boots an application with the default stock floor of zero.
    pub async fn new() -> Self {
        Self::with_stock_floor(0).await
    }

    /// Boots an application with a custom stock floor.
    pub async fn with_stock_floor(floor: i32) -> Self {
        let mut config = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A single connection keeps every query on the same in-memory database.
        config.db_max_connections = 1;
        config.db_min_connections = 1;
        config.stock_floor = floor;

        let pool = db::establish_connection_from_app_config(&config)
            .await
            .expect("test database should connect");
        db::run_migrations(&pool)
            .await
            .expect("test migrations should apply");
        let pool = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let factory =
            ServiceFactory::from_config(&config, Arc::clone(&pool), Arc::clone(&event_sender));
        let services = ServiceContainer::new(&factory);

        let state = AppState {
            db: pool,
            config,
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", stockbook_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            event_task,
        }
    }

    /// Sends one request through the router and returns the raw response.
    #[allow(dead_code)]
    pub async fn request(
        &self,
        method: http::Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(http::header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).expect("request body should serialize"))
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("request should build");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should produce a response")
    }

    #[allow(dead_code)]
    pub async fn seed_item(
        &self,
        tenant_id: Uuid,
        sku: &str,
        name: &str,
        unit_cost: Decimal,
        quantity: i32,
    ) -> ItemResponse {
        self.state
            .services
            .inventory
            .create_item(
                tenant_id,
                CreateItemRequest {
                    sku: sku.to_string(),
                    name: name.to_string(),
                    unit_cost,
                    initial_quantity: quantity,
                },
            )
            .await
            .expect("seed item should insert")
    }

    #[allow(dead_code)]
    pub async fn seed_mapping(
        &self,
        tenant_id: Uuid,
        sku: &str,
        packaging_cost: Decimal,
        components: &[(Uuid, i32)],
    ) -> CreateMappingOutcome {
        self.state
            .services
            .mappings
            .create_mapping(
                tenant_id,
                CreateMappingRequest {
                    sku: sku.to_string(),
                    packaging_cost,
                    components: components
                        .iter()
                        .map(|(item_id, quantity_per_unit)| ComponentInput {
                            item_id: *item_id,
                            quantity_per_unit: *quantity_per_unit,
                        })
                        .collect(),
                },
            )
            .await
            .expect("seed mapping should insert")
    }

    /// Ingests a single order and returns its id.
    #[allow(dead_code)]
    pub async fn seed_order(
        &self,
        tenant_id: Uuid,
        external_ref: &str,
        order_date: DateTime<Utc>,
        lines: &[(&str, i32)],
    ) -> Uuid {
        let outcome = self
            .state
            .services
            .orders
            .ingest_orders(
                tenant_id,
                IngestOrdersRequest {
                    orders: vec![IngestOrder {
                        external_ref: external_ref.to_string(),
                        order_date,
                        line_items: lines
                            .iter()
                            .map(|(sku, quantity)| IngestLineItem {
                                sku: (*sku).to_string(),
                                quantity: *quantity,
                            })
                            .collect(),
                    }],
                },
            )
            .await
            .expect("seed order should insert");
        outcome.order_ids[0]
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.event_task.abort();
    }
}

#[allow(dead_code)]
pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should be readable");
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}
