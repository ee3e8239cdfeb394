use crate::{
    db::DbPool,
    entities::{
        cost_change::{self, Entity as CostChange},
        inventory_item::{self, Entity as InventoryItem},
        stock_change::{self, ChangeReason, Entity as StockChange},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::cascade::{CascadeReport, CascadeService},
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

static SKU_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._/-]*$").expect("valid sku regex"));

fn validate_non_negative_cost(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("cost must not be negative".into());
        return Err(err);
    }
    Ok(())
}

fn validate_non_zero_delta(value: i32) -> Result<(), ValidationError> {
    if value == 0 {
        let mut err = ValidationError::new("non_zero");
        err.message = Some("delta of zero would record nothing".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    #[validate(
        length(min = 1, max = 64, message = "SKU must be 1-64 characters"),
        regex(path = "SKU_PATTERN", message = "SKU contains invalid characters")
    )]
    pub sku: String,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(custom = "validate_non_negative_cost")]
    pub unit_cost: Decimal,
    #[validate(range(min = 0, message = "Initial quantity must not be negative"))]
    #[serde(default)]
    pub initial_quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdjustStockRequest {
    #[validate(custom = "validate_non_zero_delta")]
    pub delta: i32,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChangeCostRequest {
    #[validate(custom = "validate_non_negative_cost")]
    pub new_cost: Decimal,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub sku: String,
    pub name: String,
    pub unit_cost: Decimal,
    pub quantity_on_hand: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockChangeResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub delta: i32,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    pub reason: String,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CostChangeResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub delta: Decimal,
    pub previous_cost: Decimal,
    pub new_cost: Decimal,
    pub reason: String,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Outcome of a stock adjustment: the updated item plus the ledger record
/// written with it.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockAdjustment {
    pub item: ItemResponse,
    pub record: StockChangeResponse,
}

/// Outcome of a cost change. The cascade report describes what happened to
/// the mappings that consume this item; failures there do not undo the cost
/// change itself.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CostChangeOutcome {
    pub item: ItemResponse,
    pub record: CostChangeResponse,
    pub cascade: CascadeReport,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemHistoryResponse {
    pub stock_changes: Vec<StockChangeResponse>,
    pub cost_changes: Vec<CostChangeResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemListResponse {
    pub items: Vec<ItemResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// The ledger store. Item quantity and unit cost only move through here, and
/// every movement appends a history record in the same transaction as the
/// item update.
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    cascade: Arc<CascadeService>,
}

impl InventoryService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        cascade: Arc<CascadeService>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            cascade,
        }
    }

    /// Creates an item and writes its opening stock and cost records.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, sku = %request.sku))]
    pub async fn create_item(
        &self,
        tenant_id: Uuid,
        request: CreateItemRequest,
    ) -> Result<ItemResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let item = db
            .transaction::<_, inventory_item::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = InventoryItem::find()
                        .filter(inventory_item::Column::TenantId.eq(tenant_id))
                        .filter(inventory_item::Column::Sku.eq(request.sku.clone()))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if existing.is_some() {
                        return Err(ServiceError::Conflict(format!(
                            "Item with SKU {} already exists",
                            request.sku
                        )));
                    }

                    let now = Utc::now();
                    let item = inventory_item::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        tenant_id: Set(tenant_id),
                        sku: Set(request.sku.clone()),
                        name: Set(request.name.clone()),
                        unit_cost: Set(request.unit_cost),
                        quantity_on_hand: Set(request.initial_quantity),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    stock_change::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        item_id: Set(item.id),
                        tenant_id: Set(tenant_id),
                        delta: Set(request.initial_quantity),
                        previous_quantity: Set(0),
                        new_quantity: Set(request.initial_quantity),
                        reason: Set(ChangeReason::Initial),
                        note: Set(None),
                        recorded_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    cost_change::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        item_id: Set(item.id),
                        tenant_id: Set(tenant_id),
                        delta: Set(request.unit_cost),
                        previous_cost: Set(Decimal::ZERO),
                        new_cost: Set(request.unit_cost),
                        reason: Set(ChangeReason::Initial),
                        note: Set(None),
                        recorded_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    Ok(item)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!("Created inventory item {} ({})", item.id, item.sku);

        if let Err(e) = self
            .event_sender
            .send(Event::ItemCreated {
                tenant_id,
                item_id: item.id,
                sku: item.sku.clone(),
            })
            .await
        {
            warn!("Failed to send item created event: {}", e);
        }

        Ok(item_to_response(item))
    }

    pub async fn get_item(
        &self,
        tenant_id: Uuid,
        item_id: Uuid,
    ) -> Result<ItemResponse, ServiceError> {
        let item = self.find_owned(tenant_id, item_id).await?;
        Ok(item_to_response(item))
    }

    pub async fn list_items(
        &self,
        tenant_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<ItemListResponse, ServiceError> {
        let db = &*self.db_pool;
        let paginator = InventoryItem::find()
            .filter(inventory_item::Column::TenantId.eq(tenant_id))
            .order_by_asc(inventory_item::Column::Sku)
            .paginate(db, per_page.max(1));

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok(ItemListResponse {
            items: items.into_iter().map(item_to_response).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Applies a signed stock delta and appends the movement record in the
    /// same transaction. The new quantity is exactly previous + delta.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, item_id = %item_id, delta = request.delta))]
    pub async fn adjust_stock(
        &self,
        tenant_id: Uuid,
        item_id: Uuid,
        request: AdjustStockRequest,
    ) -> Result<StockAdjustment, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let (item, record) = db
            .transaction::<_, (inventory_item::Model, stock_change::Model), ServiceError>(
                move |txn| {
                    Box::pin(async move {
                        let item = InventoryItem::find_by_id(item_id)
                            .filter(inventory_item::Column::TenantId.eq(tenant_id))
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Inventory item {} not found",
                                    item_id
                                ))
                            })?;

                        let previous = item.quantity_on_hand;
                        let new_quantity = previous + request.delta;
                        let now = Utc::now();

                        let mut active: inventory_item::ActiveModel = item.into();
                        active.quantity_on_hand = Set(new_quantity);
                        active.updated_at = Set(now);
                        let item = active.update(txn).await.map_err(ServiceError::db_error)?;

                        let record = stock_change::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            item_id: Set(item.id),
                            tenant_id: Set(tenant_id),
                            delta: Set(request.delta),
                            previous_quantity: Set(previous),
                            new_quantity: Set(new_quantity),
                            reason: Set(ChangeReason::ManualUpdate),
                            note: Set(request.note.clone()),
                            recorded_at: Set(now),
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                        Ok((item, record))
                    })
                },
            )
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            "Adjusted stock for item {}: {} -> {}",
            item.id, record.previous_quantity, record.new_quantity
        );

        if let Err(e) = self
            .event_sender
            .send(Event::StockAdjusted {
                tenant_id,
                item_id: item.id,
                delta: record.delta,
                previous_quantity: record.previous_quantity,
                new_quantity: record.new_quantity,
                reason: "manual-update".to_string(),
                change_id: record.id,
            })
            .await
        {
            warn!("Failed to send stock adjusted event: {}", e);
        }

        Ok(StockAdjustment {
            item: item_to_response(item),
            record: stock_change_to_response(record),
        })
    }

    /// Sets a new unit cost, appends the cost record, then recalculates every
    /// mapping that consumes this item. The cascade runs after the cost
    /// change commits; its failures ride the outcome instead of rolling the
    /// cost change back.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, item_id = %item_id))]
    pub async fn change_cost(
        &self,
        tenant_id: Uuid,
        item_id: Uuid,
        request: ChangeCostRequest,
    ) -> Result<CostChangeOutcome, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let (item, record) = db
            .transaction::<_, (inventory_item::Model, cost_change::Model), ServiceError>(
                move |txn| {
                    Box::pin(async move {
                        let item = InventoryItem::find_by_id(item_id)
                            .filter(inventory_item::Column::TenantId.eq(tenant_id))
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Inventory item {} not found",
                                    item_id
                                ))
                            })?;

                        let previous = item.unit_cost;
                        let delta = request.new_cost - previous;
                        let now = Utc::now();

                        let mut active: inventory_item::ActiveModel = item.into();
                        active.unit_cost = Set(request.new_cost);
                        active.updated_at = Set(now);
                        let item = active.update(txn).await.map_err(ServiceError::db_error)?;

                        let record = cost_change::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            item_id: Set(item.id),
                            tenant_id: Set(tenant_id),
                            delta: Set(delta),
                            previous_cost: Set(previous),
                            new_cost: Set(request.new_cost),
                            reason: Set(ChangeReason::ManualUpdate),
                            note: Set(request.note.clone()),
                            recorded_at: Set(now),
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                        Ok((item, record))
                    })
                },
            )
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            "Changed cost for item {}: {} -> {}",
            item.id, record.previous_cost, record.new_cost
        );

        if let Err(e) = self
            .event_sender
            .send(Event::CostChanged {
                tenant_id,
                item_id: item.id,
                delta: record.delta,
                previous_cost: record.previous_cost,
                new_cost: record.new_cost,
                change_id: record.id,
            })
            .await
        {
            warn!("Failed to send cost changed event: {}", e);
        }

        let cascade = self.cascade.recalculate_for_item(tenant_id, item_id).await;

        Ok(CostChangeOutcome {
            item: item_to_response(item),
            record: cost_change_to_response(record),
            cascade,
        })
    }

    /// Deletes an item together with its entire stock and cost history.
    /// Mapping components that referenced it are left dangling on purpose;
    /// recalculation treats them as contributing zero.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, item_id = %item_id))]
    pub async fn delete_item(&self, tenant_id: Uuid, item_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let (stock_removed, cost_removed) = db
            .transaction::<_, (u64, u64), ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = InventoryItem::find_by_id(item_id)
                        .filter(inventory_item::Column::TenantId.eq(tenant_id))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Inventory item {} not found", item_id))
                        })?;

                    let stock_removed = StockChange::delete_many()
                        .filter(stock_change::Column::ItemId.eq(item.id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .rows_affected;

                    let cost_removed = CostChange::delete_many()
                        .filter(cost_change::Column::ItemId.eq(item.id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .rows_affected;

                    InventoryItem::delete_by_id(item.id)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    Ok((stock_removed, cost_removed))
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            "Deleted item {} with {} stock and {} cost records",
            item_id, stock_removed, cost_removed
        );

        if let Err(e) = self
            .event_sender
            .send(Event::ItemDeleted {
                tenant_id,
                item_id,
                stock_records_removed: stock_removed,
                cost_records_removed: cost_removed,
            })
            .await
        {
            warn!("Failed to send item deleted event: {}", e);
        }

        Ok(())
    }

    /// Returns both ledgers for an item, oldest first.
    pub async fn item_history(
        &self,
        tenant_id: Uuid,
        item_id: Uuid,
    ) -> Result<ItemHistoryResponse, ServiceError> {
        let item = self.find_owned(tenant_id, item_id).await?;
        let db = &*self.db_pool;

        let stock_changes = StockChange::find()
            .filter(stock_change::Column::ItemId.eq(item.id))
            .order_by_asc(stock_change::Column::RecordedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let cost_changes = CostChange::find()
            .filter(cost_change::Column::ItemId.eq(item.id))
            .order_by_asc(cost_change::Column::RecordedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(ItemHistoryResponse {
            stock_changes: stock_changes
                .into_iter()
                .map(stock_change_to_response)
                .collect(),
            cost_changes: cost_changes
                .into_iter()
                .map(cost_change_to_response)
                .collect(),
        })
    }

    async fn find_owned(
        &self,
        tenant_id: Uuid,
        item_id: Uuid,
    ) -> Result<inventory_item::Model, ServiceError> {
        let db = &*self.db_pool;
        InventoryItem::find_by_id(item_id)
            .filter(inventory_item::Column::TenantId.eq(tenant_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", item_id)))
    }
}

fn item_to_response(item: inventory_item::Model) -> ItemResponse {
    ItemResponse {
        id: item.id,
        tenant_id: item.tenant_id,
        sku: item.sku,
        name: item.name,
        unit_cost: item.unit_cost,
        quantity_on_hand: item.quantity_on_hand,
        created_at: item.created_at,
        updated_at: item.updated_at,
    }
}

pub(crate) fn stock_change_to_response(record: stock_change::Model) -> StockChangeResponse {
    StockChangeResponse {
        id: record.id,
        item_id: record.item_id,
        delta: record.delta,
        previous_quantity: record.previous_quantity,
        new_quantity: record.new_quantity,
        reason: reason_label(&record.reason).to_string(),
        note: record.note,
        recorded_at: record.recorded_at,
    }
}

fn cost_change_to_response(record: cost_change::Model) -> CostChangeResponse {
    CostChangeResponse {
        id: record.id,
        item_id: record.item_id,
        delta: record.delta,
        previous_cost: record.previous_cost,
        new_cost: record.new_cost,
        reason: reason_label(&record.reason).to_string(),
        note: record.note,
        recorded_at: record.recorded_at,
    }
}

pub(crate) fn reason_label(reason: &ChangeReason) -> &'static str {
    match reason {
        ChangeReason::Initial => "initial",
        ChangeReason::ManualUpdate => "manual-update",
        ChangeReason::OrderFulfillment => "order-fulfillment",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DatabaseConnection;
    use tokio::sync::mpsc;

    fn service() -> InventoryService {
        let pool = Arc::new(DatabaseConnection::Disconnected);
        let (tx, _rx) = mpsc::channel(8);
        let sender = Arc::new(EventSender::new(tx));
        let cascade = Arc::new(CascadeService::new(pool.clone(), sender.clone()));
        InventoryService::new(pool, sender, cascade)
    }

    #[tokio::test]
    async fn create_item_rejects_bad_sku() {
        let svc = service();
        let request = CreateItemRequest {
            sku: "   ".into(),
            name: "Widget".into(),
            unit_cost: Decimal::new(100, 2),
            initial_quantity: 5,
        };

        let result = svc.create_item(Uuid::new_v4(), request).await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn adjust_stock_rejects_zero_delta() {
        let svc = service();
        let request = AdjustStockRequest {
            delta: 0,
            note: None,
        };

        let result = svc
            .adjust_stock(Uuid::new_v4(), Uuid::new_v4(), request)
            .await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn change_cost_rejects_negative_cost() {
        let svc = service();
        let request = ChangeCostRequest {
            new_cost: Decimal::new(-250, 2),
            note: None,
        };

        let result = svc
            .change_cost(Uuid::new_v4(), Uuid::new_v4(), request)
            .await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[test]
    fn reason_labels_are_stable() {
        assert_eq!(reason_label(&ChangeReason::Initial), "initial");
        assert_eq!(reason_label(&ChangeReason::ManualUpdate), "manual-update");
        assert_eq!(
            reason_label(&ChangeReason::OrderFulfillment),
            "order-fulfillment"
        );
    }
}
