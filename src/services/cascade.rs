use crate::{
    db::{DatabaseAccess, DbPool},
    entities::{
        inventory_item::{self, Entity as InventoryItem},
        sku_mapping::{self, Entity as SkuMapping},
        sku_mapping_component::{self, Entity as SkuMappingComponent},
        sku_mapping_snapshot,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// What the recalculation did to each mapping that consumes a changed item.
/// Rides the cost-change outcome; a non-empty `failed` list means some
/// mappings still carry a stale cost.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CascadeReport {
    pub recalculated: Vec<Uuid>,
    pub unchanged: Vec<Uuid>,
    pub failed: Vec<CascadeFailure>,
    /// Set when the recalculation stopped before visiting every mapping,
    /// either because the affected set could not be read or because storage
    /// went away mid-run.
    pub aborted: bool,
}

impl CascadeReport {
    pub fn has_failures(&self) -> bool {
        self.aborted || !self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CascadeFailure {
    pub mapping_id: Uuid,
    pub message: String,
}

/// Sums component quantities times current item costs. A component whose
/// item no longer exists contributes zero rather than poisoning the total.
pub fn recompute_manufacturing_cost(
    components: &[sku_mapping_component::Model],
    item_costs: &HashMap<Uuid, Decimal>,
) -> Decimal {
    components
        .iter()
        .map(|component| {
            item_costs
                .get(&component.item_id)
                .copied()
                .unwrap_or(Decimal::ZERO)
                * Decimal::from(component.quantity_per_unit)
        })
        .sum()
}

struct MappingPlan {
    mapping_id: Uuid,
    sku: String,
    current_cost: Decimal,
    new_cost: Decimal,
}

/// Recalculates mapping manufacturing costs when an item cost moves.
///
/// Runs in two phases: one read of everything affected, then one transaction
/// per mapping so a single bad mapping cannot hold the rest hostage.
#[derive(Clone)]
pub struct CascadeService {
    db: DatabaseAccess,
    event_sender: Arc<EventSender>,
}

impl CascadeService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db: DatabaseAccess::new(db_pool),
            event_sender,
        }
    }

    /// Recalculates every mapping of `tenant_id` containing `item_id`.
    ///
    /// Never returns an error: the caller already committed the cost change
    /// this cascade follows from, so trouble here is reported as data.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, item_id = %item_id))]
    pub async fn recalculate_for_item(&self, tenant_id: Uuid, item_id: Uuid) -> CascadeReport {
        let plans = match self.plan_recalculation(tenant_id, item_id).await {
            Ok(plans) => plans,
            Err(e) => {
                error!("Cascade read phase failed for item {}: {}", item_id, e);
                return CascadeReport {
                    aborted: true,
                    ..CascadeReport::default()
                };
            }
        };

        let mut report = CascadeReport::default();
        let mut abort_message: Option<String> = None;

        for plan in plans {
            if let Some(message) = &abort_message {
                report.failed.push(CascadeFailure {
                    mapping_id: plan.mapping_id,
                    message: message.clone(),
                });
                continue;
            }

            if plan.new_cost == plan.current_cost {
                report.unchanged.push(plan.mapping_id);
                continue;
            }

            match self.apply_plan(tenant_id, &plan).await {
                Ok(()) => {
                    report.recalculated.push(plan.mapping_id);
                    if let Err(e) = self
                        .event_sender
                        .send(Event::MappingRecalculated {
                            tenant_id,
                            mapping_id: plan.mapping_id,
                            previous_cost: plan.current_cost,
                            new_cost: plan.new_cost,
                        })
                        .await
                    {
                        warn!("Failed to send mapping recalculated event: {}", e);
                    }
                }
                Err(e) => {
                    warn!(
                        "Cascade write failed for mapping {} ({}): {}",
                        plan.mapping_id, plan.sku, e
                    );
                    report.failed.push(CascadeFailure {
                        mapping_id: plan.mapping_id,
                        message: e.to_string(),
                    });
                    if is_connection_loss(&e) {
                        abort_message =
                            Some("recalculation aborted after storage failure".to_string());
                    }
                }
            }
        }

        report.aborted = abort_message.is_some();
        info!(
            "Cascade for item {}: {} recalculated, {} unchanged, {} failed",
            item_id,
            report.recalculated.len(),
            report.unchanged.len(),
            report.failed.len()
        );
        report
    }

    /// Read phase: affected mappings, their full component lists and the
    /// current cost of every referenced item, all fetched up front so the
    /// recompute itself touches nothing.
    async fn plan_recalculation(
        &self,
        tenant_id: Uuid,
        item_id: Uuid,
    ) -> Result<Vec<MappingPlan>, ServiceError> {
        let affected_components = self
            .db
            .execute("cascade_affected_components", |db| {
                SkuMappingComponent::find()
                    .filter(sku_mapping_component::Column::ItemId.eq(item_id))
                    .all(db)
            })
            .await?;

        let mapping_ids: Vec<Uuid> = affected_components
            .iter()
            .map(|c| c.mapping_id)
            .collect();
        if mapping_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mappings = self
            .db
            .execute("cascade_affected_mappings", |db| {
                SkuMapping::find()
                    .filter(sku_mapping::Column::TenantId.eq(tenant_id))
                    .filter(sku_mapping::Column::Id.is_in(mapping_ids.clone()))
                    .all(db)
            })
            .await?;
        if mappings.is_empty() {
            return Ok(Vec::new());
        }

        let owned_ids: Vec<Uuid> = mappings.iter().map(|m| m.id).collect();
        let components = self
            .db
            .execute("cascade_component_lists", |db| {
                SkuMappingComponent::find()
                    .filter(sku_mapping_component::Column::MappingId.is_in(owned_ids.clone()))
                    .all(db)
            })
            .await?;

        let mut referenced_items: Vec<Uuid> = components.iter().map(|c| c.item_id).collect();
        referenced_items.sort_unstable();
        referenced_items.dedup();

        let items = self
            .db
            .execute("cascade_item_costs", |db| {
                InventoryItem::find()
                    .filter(inventory_item::Column::TenantId.eq(tenant_id))
                    .filter(inventory_item::Column::Id.is_in(referenced_items.clone()))
                    .all(db)
            })
            .await?;
        let item_costs: HashMap<Uuid, Decimal> =
            items.into_iter().map(|i| (i.id, i.unit_cost)).collect();

        let mut by_mapping: HashMap<Uuid, Vec<sku_mapping_component::Model>> = HashMap::new();
        for component in components {
            by_mapping
                .entry(component.mapping_id)
                .or_default()
                .push(component);
        }

        let plans = mappings
            .into_iter()
            .map(|mapping| {
                let empty = Vec::new();
                let mapping_components = by_mapping.get(&mapping.id).unwrap_or(&empty);
                MappingPlan {
                    mapping_id: mapping.id,
                    sku: mapping.sku.clone(),
                    current_cost: mapping.manufacturing_cost,
                    new_cost: recompute_manufacturing_cost(mapping_components, &item_costs),
                }
            })
            .collect();

        Ok(plans)
    }

    /// Write phase for one mapping: update the stored cost and append a
    /// snapshot in the same transaction.
    async fn apply_plan(&self, tenant_id: Uuid, plan: &MappingPlan) -> Result<(), ServiceError> {
        let mapping_id = plan.mapping_id;
        let new_cost = plan.new_cost;

        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    let mapping = SkuMapping::find_by_id(mapping_id)
                        .filter(sku_mapping::Column::TenantId.eq(tenant_id))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Mapping {} not found", mapping_id))
                        })?;

                    let packaging_cost = mapping.packaging_cost;
                    let now = Utc::now();

                    let mut active: sku_mapping::ActiveModel = mapping.into();
                    active.manufacturing_cost = Set(new_cost);
                    active.updated_at = Set(now);
                    active.update(txn).await.map_err(ServiceError::db_error)?;

                    sku_mapping_snapshot::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        mapping_id: Set(mapping_id),
                        tenant_id: Set(tenant_id),
                        manufacturing_cost: Set(new_cost),
                        packaging_cost: Set(packaging_cost),
                        recorded_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    Ok(())
                })
            })
            .await
    }
}

fn is_connection_loss(err: &ServiceError) -> bool {
    matches!(
        err,
        ServiceError::DatabaseError(DbErr::Conn(_) | DbErr::ConnectionAcquire(_))
    )
}
