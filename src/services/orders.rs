use crate::{
    db::DbPool,
    entities::{
        order_line_item::{self, Entity as OrderLineItem},
        order_record::{self, Entity as OrderRecord},
        unresolved_sku::{self, Entity as UnresolvedSku, UnresolvedStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionError,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct IngestLineItem {
    #[validate(length(min = 1, max = 64, message = "Line item SKU is required"))]
    pub sku: String,
    #[validate(range(min = 1, message = "Line item quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct IngestOrder {
    #[validate(length(min = 1, max = 128, message = "External reference is required"))]
    pub external_ref: String,
    pub order_date: DateTime<Utc>,
    #[validate]
    pub line_items: Vec<IngestLineItem>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct IngestOrdersRequest {
    #[validate]
    pub orders: Vec<IngestOrder>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestOutcome {
    /// Ids of the orders created by this call, in request order.
    pub order_ids: Vec<Uuid>,
    pub created: usize,
    /// Orders whose external reference was already known (or repeated within
    /// the batch) and were therefore left untouched.
    pub skipped: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LineItemResponse {
    pub id: Uuid,
    pub sku: String,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub external_ref: String,
    pub order_date: DateTime<Utc>,
    pub fulfillment_applied: bool,
    pub line_items: Vec<LineItemResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnresolvedSkuResponse {
    pub id: Uuid,
    pub sku: String,
    pub source_order_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Brings marketplace orders into the system. Ingestion is idempotent on the
/// external reference so the same export can be replayed safely; fulfillment
/// picks the orders up later.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Ingests a batch of orders in one transaction. An order whose
    /// external reference already exists for the tenant is skipped, not
    /// duplicated; the outcome reports both counts.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, orders = request.orders.len()))]
    pub async fn ingest_orders(
        &self,
        tenant_id: Uuid,
        request: IngestOrdersRequest,
    ) -> Result<IngestOutcome, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        if request.orders.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one order is required".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let outcome = db
            .transaction::<_, IngestOutcome, ServiceError>(move |txn| {
                Box::pin(async move {
                    let refs: Vec<String> = request
                        .orders
                        .iter()
                        .map(|o| o.external_ref.clone())
                        .collect();
                    let known: HashSet<String> = OrderRecord::find()
                        .filter(order_record::Column::TenantId.eq(tenant_id))
                        .filter(order_record::Column::ExternalRef.is_in(refs))
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .into_iter()
                        .map(|o| o.external_ref)
                        .collect();

                    let mut seen_in_batch = HashSet::new();
                    let mut order_ids = Vec::new();
                    let mut skipped = 0usize;
                    let now = Utc::now();

                    for order in &request.orders {
                        if known.contains(&order.external_ref)
                            || !seen_in_batch.insert(order.external_ref.clone())
                        {
                            skipped += 1;
                            continue;
                        }

                        let order_id = Uuid::new_v4();
                        order_record::ActiveModel {
                            id: Set(order_id),
                            tenant_id: Set(tenant_id),
                            external_ref: Set(order.external_ref.clone()),
                            order_date: Set(order.order_date),
                            fulfillment_applied: Set(false),
                            created_at: Set(now),
                            updated_at: Set(now),
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                        for line in &order.line_items {
                            order_line_item::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                order_id: Set(order_id),
                                sku: Set(line.sku.clone()),
                                quantity: Set(line.quantity),
                            }
                            .insert(txn)
                            .await
                            .map_err(ServiceError::db_error)?;
                        }

                        order_ids.push(order_id);
                    }

                    let created = order_ids.len();
                    Ok(IngestOutcome {
                        order_ids,
                        created,
                        skipped,
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            "Ingested orders: {} created, {} skipped",
            outcome.created, outcome.skipped
        );

        if let Err(e) = self
            .event_sender
            .send(Event::OrdersIngested {
                tenant_id,
                created: outcome.created,
                skipped: outcome.skipped,
            })
            .await
        {
            warn!("Failed to send orders ingested event: {}", e);
        }

        Ok(outcome)
    }

    pub async fn get_order(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;
        let order = OrderRecord::find_by_id(order_id)
            .filter(order_record::Column::TenantId.eq(tenant_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let lines = OrderLineItem::find()
            .filter(order_line_item::Column::OrderId.eq(order_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(order_to_response(order, lines))
    }

    /// Orders not yet pushed through fulfillment, oldest order date first.
    pub async fn list_unapplied(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        let db = &*self.db_pool;
        let orders = OrderRecord::find()
            .filter(order_record::Column::TenantId.eq(tenant_id))
            .filter(order_record::Column::FulfillmentApplied.eq(false))
            .order_by_asc(order_record::Column::OrderDate)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let lines = OrderLineItem::find()
            .filter(order_line_item::Column::OrderId.is_in(order_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut by_order: HashMap<Uuid, Vec<order_line_item::Model>> = HashMap::new();
        for line in lines {
            by_order.entry(line.order_id).or_default().push(line);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let lines = by_order.remove(&order.id).unwrap_or_default();
                order_to_response(order, lines)
            })
            .collect())
    }

    /// SKUs fulfillment could not resolve and that still await a mapping or
    /// a ledger item, oldest first.
    pub async fn list_unresolved(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<UnresolvedSkuResponse>, ServiceError> {
        let db = &*self.db_pool;
        let rows = UnresolvedSku::find()
            .filter(unresolved_sku::Column::TenantId.eq(tenant_id))
            .filter(unresolved_sku::Column::Status.eq(UnresolvedStatus::Pending))
            .order_by_asc(unresolved_sku::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows
            .into_iter()
            .map(|row| UnresolvedSkuResponse {
                id: row.id,
                sku: row.sku,
                source_order_id: row.source_order_id,
                status: match row.status {
                    UnresolvedStatus::Pending => "pending".to_string(),
                    UnresolvedStatus::Resolved => "resolved".to_string(),
                },
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }
}

fn order_to_response(
    order: order_record::Model,
    lines: Vec<order_line_item::Model>,
) -> OrderResponse {
    OrderResponse {
        id: order.id,
        tenant_id: order.tenant_id,
        external_ref: order.external_ref,
        order_date: order.order_date,
        fulfillment_applied: order.fulfillment_applied,
        line_items: lines
            .into_iter()
            .map(|line| LineItemResponse {
                id: line.id,
                sku: line.sku,
                quantity: line.quantity,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DatabaseConnection;
    use tokio::sync::mpsc;

    fn service() -> OrderService {
        let pool = Arc::new(DatabaseConnection::Disconnected);
        let (tx, _rx) = mpsc::channel(8);
        OrderService::new(pool, Arc::new(EventSender::new(tx)))
    }

    #[tokio::test]
    async fn ingest_rejects_empty_batch() {
        let svc = service();
        let request = IngestOrdersRequest { orders: vec![] };

        let result = svc.ingest_orders(Uuid::new_v4(), request).await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn ingest_rejects_zero_quantity_line() {
        let svc = service();
        let request = IngestOrdersRequest {
            orders: vec![IngestOrder {
                external_ref: "AMZ-1001".into(),
                order_date: Utc::now(),
                line_items: vec![IngestLineItem {
                    sku: "WIDGET-1".into(),
                    quantity: 0,
                }],
            }],
        };

        let result = svc.ingest_orders(Uuid::new_v4(), request).await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn ingest_rejects_blank_external_ref() {
        let svc = service();
        let request = IngestOrdersRequest {
            orders: vec![IngestOrder {
                external_ref: String::new(),
                order_date: Utc::now(),
                line_items: vec![IngestLineItem {
                    sku: "WIDGET-1".into(),
                    quantity: 1,
                }],
            }],
        };

        let result = svc.ingest_orders(Uuid::new_v4(), request).await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }
}
