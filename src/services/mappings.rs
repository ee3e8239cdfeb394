use crate::{
    db::DbPool,
    entities::{
        inventory_item::{self, Entity as InventoryItem},
        sku_mapping::{self, Entity as SkuMapping},
        sku_mapping_component::{self, Entity as SkuMappingComponent},
        sku_mapping_snapshot::{self, Entity as SkuMappingSnapshot},
        unresolved_sku::{self, Entity as UnresolvedSku, UnresolvedStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::cascade::recompute_manufacturing_cost,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_non_negative_cost(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("cost must not be negative".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ComponentInput {
    pub item_id: Uuid,
    #[validate(range(min = 1, message = "Component quantity must be at least 1"))]
    pub quantity_per_unit: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateMappingRequest {
    #[validate(length(min = 1, max = 64, message = "SKU must be 1-64 characters"))]
    pub sku: String,
    #[validate(custom = "validate_non_negative_cost")]
    pub packaging_cost: Decimal,
    #[validate]
    #[serde(default)]
    pub components: Vec<ComponentInput>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateMappingRequest {
    /// New catalog SKU for the mapping. Conflicts like a create.
    #[validate(length(min = 1, max = 64, message = "SKU must be 1-64 characters"))]
    pub sku: Option<String>,
    #[validate(custom = "validate_non_negative_cost")]
    pub packaging_cost: Option<Decimal>,
    #[validate]
    pub components: Option<Vec<ComponentInput>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MappingResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub sku: String,
    pub manufacturing_cost: Decimal,
    pub packaging_cost: Decimal,
    pub total_unit_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentResponse {
    pub item_id: Uuid,
    pub quantity_per_unit: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SnapshotResponse {
    pub id: Uuid,
    pub manufacturing_cost: Decimal,
    pub packaging_cost: Decimal,
    pub total_unit_cost: Decimal,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MappingDetailResponse {
    #[serde(flatten)]
    pub mapping: MappingResponse,
    pub components: Vec<ComponentResponse>,
    pub snapshots: Vec<SnapshotResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MappingListResponse {
    pub mappings: Vec<MappingResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateMappingOutcome {
    pub mapping: MappingResponse,
    /// Pending unresolved-SKU rows this mapping closed out.
    pub unresolved_resolved: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteMappingOutcome {
    pub mapping_id: Uuid,
    /// Unresolved-SKU rows reopened because their mapping is gone.
    pub unresolved_reopened: u64,
}

/// Maps marketplace SKUs onto ledger items. The stored manufacturing cost is
/// always derived from the component items, never accepted from the caller,
/// and every write leaves a cost snapshot behind for later valuation.
#[derive(Clone)]
pub struct MappingService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl MappingService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a mapping, derives its manufacturing cost from the component
    /// items, writes the first snapshot and resolves any pending unresolved
    /// rows for the same SKU, all in one transaction.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, sku = %request.sku))]
    pub async fn create_mapping(
        &self,
        tenant_id: Uuid,
        request: CreateMappingRequest,
    ) -> Result<CreateMappingOutcome, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        reject_duplicate_components(&request.components)?;

        let db = &*self.db_pool;
        let (mapping, resolved) = db
            .transaction::<_, (sku_mapping::Model, u64), ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = SkuMapping::find()
                        .filter(sku_mapping::Column::TenantId.eq(tenant_id))
                        .filter(sku_mapping::Column::Sku.eq(request.sku.clone()))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if existing.is_some() {
                        return Err(ServiceError::Conflict(format!(
                            "Mapping for SKU {} already exists",
                            request.sku
                        )));
                    }

                    let item_costs =
                        load_component_item_costs(txn, tenant_id, &request.components).await?;

                    let now = Utc::now();
                    let mapping_id = Uuid::new_v4();
                    let components: Vec<sku_mapping_component::Model> = request
                        .components
                        .iter()
                        .map(|input| sku_mapping_component::Model {
                            id: Uuid::new_v4(),
                            mapping_id,
                            item_id: input.item_id,
                            quantity_per_unit: input.quantity_per_unit,
                        })
                        .collect();
                    let manufacturing_cost =
                        recompute_manufacturing_cost(&components, &item_costs);

                    let mapping = sku_mapping::ActiveModel {
                        id: Set(mapping_id),
                        tenant_id: Set(tenant_id),
                        sku: Set(request.sku.clone()),
                        manufacturing_cost: Set(manufacturing_cost),
                        packaging_cost: Set(request.packaging_cost),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    for component in &components {
                        sku_mapping_component::ActiveModel {
                            id: Set(component.id),
                            mapping_id: Set(component.mapping_id),
                            item_id: Set(component.item_id),
                            quantity_per_unit: Set(component.quantity_per_unit),
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    }

                    sku_mapping_snapshot::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        mapping_id: Set(mapping_id),
                        tenant_id: Set(tenant_id),
                        manufacturing_cost: Set(manufacturing_cost),
                        packaging_cost: Set(request.packaging_cost),
                        recorded_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let resolved = UnresolvedSku::update_many()
                        .col_expr(
                            unresolved_sku::Column::Status,
                            Expr::value(UnresolvedStatus::Resolved),
                        )
                        .col_expr(unresolved_sku::Column::UpdatedAt, Expr::value(now))
                        .filter(unresolved_sku::Column::TenantId.eq(tenant_id))
                        .filter(unresolved_sku::Column::Sku.eq(request.sku.clone()))
                        .filter(unresolved_sku::Column::Status.eq(UnresolvedStatus::Pending))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .rows_affected;

                    Ok((mapping, resolved))
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            "Created mapping {} for SKU {} (manufacturing cost {}, {} unresolved rows closed)",
            mapping.id, mapping.sku, mapping.manufacturing_cost, resolved
        );

        if let Err(e) = self
            .event_sender
            .send(Event::MappingCreated {
                tenant_id,
                mapping_id: mapping.id,
                sku: mapping.sku.clone(),
                manufacturing_cost: mapping.manufacturing_cost,
                unresolved_resolved: resolved,
            })
            .await
        {
            warn!("Failed to send mapping created event: {}", e);
        }

        Ok(CreateMappingOutcome {
            mapping: mapping_to_response(mapping),
            unresolved_resolved: resolved,
        })
    }

    /// Applies sku/packaging/component changes, recomputes the manufacturing
    /// cost from the resulting component set and appends a snapshot whether
    /// or not the derived numbers moved. A renamed mapping closes pending
    /// unresolved rows for its new SKU, just like a create.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, mapping_id = %mapping_id))]
    pub async fn update_mapping(
        &self,
        tenant_id: Uuid,
        mapping_id: Uuid,
        request: UpdateMappingRequest,
    ) -> Result<MappingResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        if let Some(components) = &request.components {
            reject_duplicate_components(components)?;
        }

        let db = &*self.db_pool;
        let (mapping, resolved) = db
            .transaction::<_, (sku_mapping::Model, u64), ServiceError>(move |txn| {
                Box::pin(async move {
                    let mapping = SkuMapping::find_by_id(mapping_id)
                        .filter(sku_mapping::Column::TenantId.eq(tenant_id))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Mapping {} not found", mapping_id))
                        })?;

                    let new_sku = match &request.sku {
                        Some(sku) if *sku != mapping.sku => {
                            let taken = SkuMapping::find()
                                .filter(sku_mapping::Column::TenantId.eq(tenant_id))
                                .filter(sku_mapping::Column::Sku.eq(sku.clone()))
                                .filter(sku_mapping::Column::Id.ne(mapping_id))
                                .one(txn)
                                .await
                                .map_err(ServiceError::db_error)?;
                            if taken.is_some() {
                                return Err(ServiceError::Conflict(format!(
                                    "Mapping for SKU {} already exists",
                                    sku
                                )));
                            }
                            Some(sku.clone())
                        }
                        _ => None,
                    };

                    let components = match &request.components {
                        Some(inputs) => {
                            SkuMappingComponent::delete_many()
                                .filter(sku_mapping_component::Column::MappingId.eq(mapping_id))
                                .exec(txn)
                                .await
                                .map_err(ServiceError::db_error)?;

                            let replacement: Vec<sku_mapping_component::Model> = inputs
                                .iter()
                                .map(|input| sku_mapping_component::Model {
                                    id: Uuid::new_v4(),
                                    mapping_id,
                                    item_id: input.item_id,
                                    quantity_per_unit: input.quantity_per_unit,
                                })
                                .collect();
                            for component in &replacement {
                                sku_mapping_component::ActiveModel {
                                    id: Set(component.id),
                                    mapping_id: Set(component.mapping_id),
                                    item_id: Set(component.item_id),
                                    quantity_per_unit: Set(component.quantity_per_unit),
                                }
                                .insert(txn)
                                .await
                                .map_err(ServiceError::db_error)?;
                            }
                            replacement
                        }
                        None => SkuMappingComponent::find()
                            .filter(sku_mapping_component::Column::MappingId.eq(mapping_id))
                            .all(txn)
                            .await
                            .map_err(ServiceError::db_error)?,
                    };

                    let inputs: Vec<ComponentInput> = components
                        .iter()
                        .map(|c| ComponentInput {
                            item_id: c.item_id,
                            quantity_per_unit: c.quantity_per_unit,
                        })
                        .collect();
                    let item_costs = if request.components.is_some() {
                        load_component_item_costs(txn, tenant_id, &inputs).await?
                    } else {
                        current_item_costs(txn, tenant_id, &inputs).await?
                    };
                    let manufacturing_cost =
                        recompute_manufacturing_cost(&components, &item_costs);
                    let packaging_cost =
                        request.packaging_cost.unwrap_or(mapping.packaging_cost);
                    let now = Utc::now();

                    let mut active: sku_mapping::ActiveModel = mapping.into();
                    active.manufacturing_cost = Set(manufacturing_cost);
                    active.packaging_cost = Set(packaging_cost);
                    active.updated_at = Set(now);
                    if let Some(sku) = &new_sku {
                        active.sku = Set(sku.clone());
                    }
                    let mapping = active.update(txn).await.map_err(ServiceError::db_error)?;

                    sku_mapping_snapshot::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        mapping_id: Set(mapping_id),
                        tenant_id: Set(tenant_id),
                        manufacturing_cost: Set(manufacturing_cost),
                        packaging_cost: Set(packaging_cost),
                        recorded_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    // The mapping now covers its new SKU; close anything
                    // parked under it.
                    let resolved = match &new_sku {
                        Some(sku) => {
                            UnresolvedSku::update_many()
                                .col_expr(
                                    unresolved_sku::Column::Status,
                                    Expr::value(UnresolvedStatus::Resolved),
                                )
                                .col_expr(unresolved_sku::Column::UpdatedAt, Expr::value(now))
                                .filter(unresolved_sku::Column::TenantId.eq(tenant_id))
                                .filter(unresolved_sku::Column::Sku.eq(sku.clone()))
                                .filter(
                                    unresolved_sku::Column::Status.eq(UnresolvedStatus::Pending),
                                )
                                .exec(txn)
                                .await
                                .map_err(ServiceError::db_error)?
                                .rows_affected
                        }
                        None => 0,
                    };

                    Ok((mapping, resolved))
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            "Updated mapping {} (manufacturing cost {}, {} unresolved rows closed)",
            mapping.id, mapping.manufacturing_cost, resolved
        );

        if let Err(e) = self
            .event_sender
            .send(Event::MappingUpdated {
                tenant_id,
                mapping_id: mapping.id,
                sku: mapping.sku.clone(),
                manufacturing_cost: mapping.manufacturing_cost,
            })
            .await
        {
            warn!("Failed to send mapping updated event: {}", e);
        }

        Ok(mapping_to_response(mapping))
    }

    /// Deletes a mapping with its components and snapshots, and reopens any
    /// unresolved rows it had previously resolved.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, mapping_id = %mapping_id))]
    pub async fn delete_mapping(
        &self,
        tenant_id: Uuid,
        mapping_id: Uuid,
    ) -> Result<DeleteMappingOutcome, ServiceError> {
        let db = &*self.db_pool;
        let (sku, reopened) = db
            .transaction::<_, (String, u64), ServiceError>(move |txn| {
                Box::pin(async move {
                    let mapping = SkuMapping::find_by_id(mapping_id)
                        .filter(sku_mapping::Column::TenantId.eq(tenant_id))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Mapping {} not found", mapping_id))
                        })?;

                    SkuMappingSnapshot::delete_many()
                        .filter(sku_mapping_snapshot::Column::MappingId.eq(mapping_id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    SkuMappingComponent::delete_many()
                        .filter(sku_mapping_component::Column::MappingId.eq(mapping_id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    SkuMapping::delete_by_id(mapping_id)
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let now = Utc::now();
                    let reopened = UnresolvedSku::update_many()
                        .col_expr(
                            unresolved_sku::Column::Status,
                            Expr::value(UnresolvedStatus::Pending),
                        )
                        .col_expr(unresolved_sku::Column::UpdatedAt, Expr::value(now))
                        .filter(unresolved_sku::Column::TenantId.eq(tenant_id))
                        .filter(unresolved_sku::Column::Sku.eq(mapping.sku.clone()))
                        .filter(unresolved_sku::Column::Status.eq(UnresolvedStatus::Resolved))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .rows_affected;

                    Ok((mapping.sku, reopened))
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            "Deleted mapping {} for SKU {} ({} unresolved rows reopened)",
            mapping_id, sku, reopened
        );

        if let Err(e) = self
            .event_sender
            .send(Event::MappingDeleted {
                tenant_id,
                mapping_id,
                sku,
                unresolved_reopened: reopened,
            })
            .await
        {
            warn!("Failed to send mapping deleted event: {}", e);
        }

        Ok(DeleteMappingOutcome {
            mapping_id,
            unresolved_reopened: reopened,
        })
    }

    /// Returns the mapping with its components and full snapshot history,
    /// oldest snapshot first.
    pub async fn get_mapping(
        &self,
        tenant_id: Uuid,
        mapping_id: Uuid,
    ) -> Result<MappingDetailResponse, ServiceError> {
        let db = &*self.db_pool;
        let mapping = SkuMapping::find_by_id(mapping_id)
            .filter(sku_mapping::Column::TenantId.eq(tenant_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Mapping {} not found", mapping_id)))?;

        let components = SkuMappingComponent::find()
            .filter(sku_mapping_component::Column::MappingId.eq(mapping_id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let snapshots = SkuMappingSnapshot::find()
            .filter(sku_mapping_snapshot::Column::MappingId.eq(mapping_id))
            .order_by_asc(sku_mapping_snapshot::Column::RecordedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(MappingDetailResponse {
            mapping: mapping_to_response(mapping),
            components: components
                .into_iter()
                .map(|c| ComponentResponse {
                    item_id: c.item_id,
                    quantity_per_unit: c.quantity_per_unit,
                })
                .collect(),
            snapshots: snapshots
                .into_iter()
                .map(|s| SnapshotResponse {
                    id: s.id,
                    manufacturing_cost: s.manufacturing_cost,
                    packaging_cost: s.packaging_cost,
                    total_unit_cost: s.manufacturing_cost + s.packaging_cost,
                    recorded_at: s.recorded_at,
                })
                .collect(),
        })
    }

    pub async fn list_mappings(
        &self,
        tenant_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<MappingListResponse, ServiceError> {
        let db = &*self.db_pool;
        let paginator = SkuMapping::find()
            .filter(sku_mapping::Column::TenantId.eq(tenant_id))
            .order_by_asc(sku_mapping::Column::Sku)
            .paginate(db, per_page.max(1));

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;
        let mappings = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok(MappingListResponse {
            mappings: mappings.into_iter().map(mapping_to_response).collect(),
            total,
            page,
            per_page,
        })
    }
}

fn reject_duplicate_components(components: &[ComponentInput]) -> Result<(), ServiceError> {
    let mut seen = HashSet::new();
    for component in components {
        if !seen.insert(component.item_id) {
            return Err(ServiceError::ValidationError(format!(
                "Component item {} listed more than once",
                component.item_id
            )));
        }
    }
    Ok(())
}

/// Loads current costs for the referenced items and rejects references to
/// items the tenant does not have. Used for caller-supplied component sets;
/// dangling references only ever arise later, from item deletion.
async fn load_component_item_costs<C: sea_orm::ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    components: &[ComponentInput],
) -> Result<HashMap<Uuid, Decimal>, ServiceError> {
    let costs = current_item_costs(conn, tenant_id, components).await?;
    let missing: Vec<String> = components
        .iter()
        .filter(|c| !costs.contains_key(&c.item_id))
        .map(|c| c.item_id.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "Components reference unknown items: {}",
            missing.join(", ")
        )));
    }
    Ok(costs)
}

async fn current_item_costs<C: sea_orm::ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    components: &[ComponentInput],
) -> Result<HashMap<Uuid, Decimal>, ServiceError> {
    if components.is_empty() {
        return Ok(HashMap::new());
    }
    let ids: Vec<Uuid> = components.iter().map(|c| c.item_id).collect();
    let items = InventoryItem::find()
        .filter(inventory_item::Column::TenantId.eq(tenant_id))
        .filter(inventory_item::Column::Id.is_in(ids))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(items.into_iter().map(|i| (i.id, i.unit_cost)).collect())
}

fn mapping_to_response(mapping: sku_mapping::Model) -> MappingResponse {
    let total = mapping.manufacturing_cost + mapping.packaging_cost;
    MappingResponse {
        id: mapping.id,
        tenant_id: mapping.tenant_id,
        sku: mapping.sku,
        manufacturing_cost: mapping.manufacturing_cost,
        packaging_cost: mapping.packaging_cost,
        total_unit_cost: total,
        created_at: mapping.created_at,
        updated_at: mapping.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sea_orm::DatabaseConnection;
    use tokio::sync::mpsc;

    fn service() -> MappingService {
        let pool = Arc::new(DatabaseConnection::Disconnected);
        let (tx, _rx) = mpsc::channel(8);
        MappingService::new(pool, Arc::new(EventSender::new(tx)))
    }

    #[tokio::test]
    async fn create_mapping_rejects_empty_sku() {
        let svc = service();
        let request = CreateMappingRequest {
            sku: String::new(),
            packaging_cost: dec!(1.50),
            components: vec![],
        };

        let result = svc.create_mapping(Uuid::new_v4(), request).await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn create_mapping_rejects_duplicate_component() {
        let svc = service();
        let item = Uuid::new_v4();
        let request = CreateMappingRequest {
            sku: "COMBO-1".into(),
            packaging_cost: dec!(0.80),
            components: vec![
                ComponentInput {
                    item_id: item,
                    quantity_per_unit: 1,
                },
                ComponentInput {
                    item_id: item,
                    quantity_per_unit: 2,
                },
            ],
        };

        let result = svc.create_mapping(Uuid::new_v4(), request).await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn update_mapping_rejects_zero_quantity_component() {
        let svc = service();
        let request = UpdateMappingRequest {
            sku: None,
            packaging_cost: None,
            components: Some(vec![ComponentInput {
                item_id: Uuid::new_v4(),
                quantity_per_unit: 0,
            }]),
        };

        let result = svc
            .update_mapping(Uuid::new_v4(), Uuid::new_v4(), request)
            .await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[test]
    fn mapping_response_totals_costs() {
        let mapping = sku_mapping::Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            sku: "KIT-9".into(),
            manufacturing_cost: dec!(10.40),
            packaging_cost: dec!(1.10),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let response = mapping_to_response(mapping);
        assert_eq!(response.total_unit_cost, dec!(11.50));
    }
}
