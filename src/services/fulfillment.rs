use crate::{
    db::DbPool,
    entities::{
        inventory_item::{self, Entity as InventoryItem},
        order_line_item::{self, Entity as OrderLineItem},
        order_record::{self, Entity as OrderRecord},
        sku_mapping::{self, Entity as SkuMapping},
        sku_mapping_component::{self, Entity as SkuMappingComponent},
        stock_change::{self, ChangeReason},
        unresolved_sku::{self, Entity as UnresolvedSku, UnresolvedStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory::{stock_change_to_response, StockChangeResponse},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionError,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ApplyFulfillmentRequest {
    /// Orders to apply. When omitted, every order not yet applied is taken.
    pub order_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnresolvedLine {
    pub order_id: Uuid,
    pub sku: String,
    pub quantity: i32,
}

/// A deduction that ran into the stock floor. `applied` is how many units
/// actually came off; the rest is the shortfall.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Shortfall {
    pub item_id: Uuid,
    pub sku: String,
    pub requested: i32,
    pub applied: i32,
    pub shortfall: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FulfillmentOutcome {
    pub applied_orders: Vec<Uuid>,
    /// Orders that were already applied by an earlier run.
    pub skipped_orders: Vec<Uuid>,
    pub unresolved: Vec<UnresolvedLine>,
    pub shortfalls: Vec<Shortfall>,
    /// One coalesced ledger record per touched item.
    pub stock_changes: Vec<StockChangeResponse>,
}

/// How many units to take off `previous` without going under `floor`.
/// Returns the applied delta (zero or negative) and the unmet remainder.
/// Stock already at or under the floor is left where it is; a deduction
/// never raises a quantity.
pub fn clamp_deduction(previous: i32, requested: i32, floor: i32) -> (i32, i32) {
    let available = (previous - floor).max(0);
    let applied = requested.min(available);
    (-applied, requested - applied)
}

struct LineResolution {
    deductions: Vec<(Uuid, i32)>,
    resolved: bool,
}

/// Turns ingested orders into stock deductions. The whole batch runs in one
/// transaction: per line a mapping for the SKU wins, a bare item matched by
/// SKU or name comes second, and anything else is parked as an unresolved
/// SKU for a human to map. Deductions are coalesced per item so each item
/// gets exactly one ledger record per run.
#[derive(Clone)]
pub struct FulfillmentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    stock_floor: i32,
}

impl FulfillmentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, stock_floor: i32) -> Self {
        Self {
            db_pool,
            event_sender,
            stock_floor,
        }
    }

    #[instrument(skip(self, request), fields(tenant_id = %tenant_id))]
    pub async fn resolve_and_apply(
        &self,
        tenant_id: Uuid,
        request: ApplyFulfillmentRequest,
    ) -> Result<FulfillmentOutcome, ServiceError> {
        let stock_floor = self.stock_floor;
        let db = &*self.db_pool;

        let outcome = db
            .transaction::<_, FulfillmentOutcome, ServiceError>(move |txn| {
                Box::pin(async move {
                    let (orders, skipped_orders) =
                        select_orders(txn, tenant_id, request.order_ids).await?;
                    if orders.is_empty() {
                        return Ok(FulfillmentOutcome {
                            applied_orders: Vec::new(),
                            skipped_orders,
                            unresolved: Vec::new(),
                            shortfalls: Vec::new(),
                            stock_changes: Vec::new(),
                        });
                    }

                    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
                    let lines = OrderLineItem::find()
                        .filter(order_line_item::Column::OrderId.is_in(order_ids.clone()))
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let resolver = Resolver::load(txn, tenant_id, &lines).await?;

                    let mut deductions: BTreeMap<Uuid, i32> = BTreeMap::new();
                    let mut unresolved: Vec<UnresolvedLine> = Vec::new();
                    let mut resolved_lines_per_order: HashMap<Uuid, usize> = HashMap::new();
                    let mut lines_per_order: HashMap<Uuid, usize> = HashMap::new();

                    for line in &lines {
                        *lines_per_order.entry(line.order_id).or_default() += 1;
                        let resolution = resolver.resolve(line);
                        if resolution.resolved {
                            *resolved_lines_per_order.entry(line.order_id).or_default() += 1;
                            for (item_id, quantity) in resolution.deductions {
                                *deductions.entry(item_id).or_default() += quantity;
                            }
                        } else {
                            unresolved.push(UnresolvedLine {
                                order_id: line.order_id,
                                sku: line.sku.clone(),
                                quantity: line.quantity,
                            });
                        }
                    }

                    let (stock_changes, shortfalls) =
                        apply_deductions(txn, tenant_id, &deductions, stock_floor).await?;

                    record_unresolved(txn, tenant_id, &unresolved).await?;

                    // An order counts as applied once at least one of its
                    // lines resolved; a fully unresolved order stays open so
                    // a later run can pick it up once a mapping exists.
                    let now = Utc::now();
                    let mut applied_orders = Vec::new();
                    for order in orders {
                        let total = lines_per_order.get(&order.id).copied().unwrap_or(0);
                        let resolved =
                            resolved_lines_per_order.get(&order.id).copied().unwrap_or(0);
                        if total > 0 && resolved == 0 {
                            continue;
                        }
                        let order_id = order.id;
                        let mut active: order_record::ActiveModel = order.into();
                        active.fulfillment_applied = Set(true);
                        active.updated_at = Set(now);
                        active.update(txn).await.map_err(ServiceError::db_error)?;
                        applied_orders.push(order_id);
                    }

                    Ok(FulfillmentOutcome {
                        applied_orders,
                        skipped_orders,
                        unresolved,
                        shortfalls,
                        stock_changes,
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            "Fulfillment applied: {} orders, {} skipped, {} items deducted, {} unresolved, {} shortfalls",
            outcome.applied_orders.len(),
            outcome.skipped_orders.len(),
            outcome.stock_changes.len(),
            outcome.unresolved.len(),
            outcome.shortfalls.len()
        );

        for line in &outcome.unresolved {
            if let Err(e) = self
                .event_sender
                .send(Event::UnresolvedSkuRecorded {
                    tenant_id,
                    sku: line.sku.clone(),
                    source_order_id: line.order_id,
                })
                .await
            {
                warn!("Failed to send unresolved sku event: {}", e);
            }
        }

        if let Err(e) = self
            .event_sender
            .send(Event::FulfillmentApplied {
                tenant_id,
                orders_applied: outcome.applied_orders.len(),
                orders_skipped: outcome.skipped_orders.len(),
                items_deducted: outcome.stock_changes.len(),
                unresolved_skus: outcome.unresolved.len(),
                shortfalls: outcome.shortfalls.len(),
            })
            .await
        {
            warn!("Failed to send fulfillment applied event: {}", e);
        }

        Ok(outcome)
    }
}

/// Picks the batch. Explicit ids must all exist; already-applied orders are
/// reported as skipped instead of deducted twice.
async fn select_orders(
    txn: &sea_orm::DatabaseTransaction,
    tenant_id: Uuid,
    order_ids: Option<Vec<Uuid>>,
) -> Result<(Vec<order_record::Model>, Vec<Uuid>), ServiceError> {
    match order_ids {
        Some(ids) => {
            let found = OrderRecord::find()
                .filter(order_record::Column::TenantId.eq(tenant_id))
                .filter(order_record::Column::Id.is_in(ids.clone()))
                .order_by_asc(order_record::Column::OrderDate)
                .all(txn)
                .await
                .map_err(ServiceError::db_error)?;

            let found_ids: HashSet<Uuid> = found.iter().map(|o| o.id).collect();
            if let Some(missing) = ids.iter().find(|id| !found_ids.contains(id)) {
                return Err(ServiceError::NotFound(format!(
                    "Order {} not found",
                    missing
                )));
            }

            let (applied, open): (Vec<_>, Vec<_>) =
                found.into_iter().partition(|o| o.fulfillment_applied);
            Ok((open, applied.into_iter().map(|o| o.id).collect()))
        }
        None => {
            let open = OrderRecord::find()
                .filter(order_record::Column::TenantId.eq(tenant_id))
                .filter(order_record::Column::FulfillmentApplied.eq(false))
                .order_by_asc(order_record::Column::OrderDate)
                .all(txn)
                .await
                .map_err(ServiceError::db_error)?;
            Ok((open, Vec::new()))
        }
    }
}

/// Everything the per-line resolution needs, loaded in four queries so the
/// loop itself never touches the database.
struct Resolver {
    mappings_by_sku: HashMap<String, Uuid>,
    components_by_mapping: HashMap<Uuid, Vec<sku_mapping_component::Model>>,
    items_by_sku: HashMap<String, Uuid>,
    items_by_name: HashMap<String, Uuid>,
}

impl Resolver {
    async fn load(
        txn: &sea_orm::DatabaseTransaction,
        tenant_id: Uuid,
        lines: &[order_line_item::Model],
    ) -> Result<Self, ServiceError> {
        let skus: Vec<String> = lines
            .iter()
            .map(|l| l.sku.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let mappings = SkuMapping::find()
            .filter(sku_mapping::Column::TenantId.eq(tenant_id))
            .filter(sku_mapping::Column::Sku.is_in(skus.clone()))
            .all(txn)
            .await
            .map_err(ServiceError::db_error)?;
        let mappings_by_sku: HashMap<String, Uuid> =
            mappings.iter().map(|m| (m.sku.clone(), m.id)).collect();

        let mapping_ids: Vec<Uuid> = mappings.iter().map(|m| m.id).collect();
        let mut components_by_mapping: HashMap<Uuid, Vec<sku_mapping_component::Model>> =
            HashMap::new();
        if !mapping_ids.is_empty() {
            let components = SkuMappingComponent::find()
                .filter(sku_mapping_component::Column::MappingId.is_in(mapping_ids))
                .all(txn)
                .await
                .map_err(ServiceError::db_error)?;
            for component in components {
                components_by_mapping
                    .entry(component.mapping_id)
                    .or_default()
                    .push(component);
            }
        }

        let direct_items = InventoryItem::find()
            .filter(inventory_item::Column::TenantId.eq(tenant_id))
            .filter(
                inventory_item::Column::Sku
                    .is_in(skus.clone())
                    .or(inventory_item::Column::Name.is_in(skus)),
            )
            .order_by_asc(inventory_item::Column::Sku)
            .all(txn)
            .await
            .map_err(ServiceError::db_error)?;

        let mut items_by_sku = HashMap::new();
        let mut items_by_name = HashMap::new();
        for item in direct_items {
            items_by_sku.entry(item.sku.clone()).or_insert(item.id);
            items_by_name.entry(item.name.clone()).or_insert(item.id);
        }

        Ok(Self {
            mappings_by_sku,
            components_by_mapping,
            items_by_sku,
            items_by_name,
        })
    }

    /// Mapping with at least one component wins; an empty mapping falls
    /// through to a direct item match on SKU, then on name.
    fn resolve(&self, line: &order_line_item::Model) -> LineResolution {
        if let Some(mapping_id) = self.mappings_by_sku.get(&line.sku) {
            if let Some(components) = self.components_by_mapping.get(mapping_id) {
                if !components.is_empty() {
                    return LineResolution {
                        deductions: components
                            .iter()
                            .map(|c| (c.item_id, c.quantity_per_unit * line.quantity))
                            .collect(),
                        resolved: true,
                    };
                }
            }
        }

        if let Some(item_id) = self
            .items_by_sku
            .get(&line.sku)
            .or_else(|| self.items_by_name.get(&line.sku))
        {
            return LineResolution {
                deductions: vec![(*item_id, line.quantity)],
                resolved: true,
            };
        }

        LineResolution {
            deductions: Vec::new(),
            resolved: false,
        }
    }
}

/// Writes the coalesced deductions: one item update plus one ledger record
/// per item, clamped at the stock floor. A component whose item has since
/// been deleted deducts nothing.
async fn apply_deductions(
    txn: &sea_orm::DatabaseTransaction,
    tenant_id: Uuid,
    deductions: &BTreeMap<Uuid, i32>,
    stock_floor: i32,
) -> Result<(Vec<StockChangeResponse>, Vec<Shortfall>), ServiceError> {
    let mut stock_changes = Vec::new();
    let mut shortfalls = Vec::new();

    for (&item_id, &requested) in deductions {
        let Some(item) = InventoryItem::find_by_id(item_id)
            .filter(inventory_item::Column::TenantId.eq(tenant_id))
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
        else {
            warn!("Skipping deduction for missing item {}", item_id);
            continue;
        };

        let previous = item.quantity_on_hand;
        let (applied_delta, shortfall) = clamp_deduction(previous, requested, stock_floor);
        let new_quantity = previous + applied_delta;
        let now = Utc::now();

        let note = if shortfall > 0 {
            shortfalls.push(Shortfall {
                item_id,
                sku: item.sku.clone(),
                requested,
                applied: -applied_delta,
                shortfall,
            });
            Some(format!(
                "requested deduction {} clamped at stock floor {}",
                requested, stock_floor
            ))
        } else {
            None
        };

        let mut active: inventory_item::ActiveModel = item.into();
        active.quantity_on_hand = Set(new_quantity);
        active.updated_at = Set(now);
        active.update(txn).await.map_err(ServiceError::db_error)?;

        let record = stock_change::ActiveModel {
            id: Set(Uuid::new_v4()),
            item_id: Set(item_id),
            tenant_id: Set(tenant_id),
            delta: Set(applied_delta),
            previous_quantity: Set(previous),
            new_quantity: Set(new_quantity),
            reason: Set(ChangeReason::OrderFulfillment),
            note: Set(note),
            recorded_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(ServiceError::db_error)?;

        stock_changes.push(stock_change_to_response(record));
    }

    Ok((stock_changes, shortfalls))
}

/// Parks unresolved lines, once per (sku, source order). Reruns of the same
/// batch find the existing row and leave it alone.
async fn record_unresolved(
    txn: &sea_orm::DatabaseTransaction,
    tenant_id: Uuid,
    unresolved: &[UnresolvedLine],
) -> Result<(), ServiceError> {
    for line in unresolved {
        let existing = UnresolvedSku::find()
            .filter(unresolved_sku::Column::TenantId.eq(tenant_id))
            .filter(unresolved_sku::Column::Sku.eq(line.sku.clone()))
            .filter(unresolved_sku::Column::SourceOrderId.eq(line.order_id))
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            continue;
        }

        let now = Utc::now();
        unresolved_sku::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            sku: Set(line.sku.clone()),
            source_order_id: Set(line.order_id),
            status: Set(UnresolvedStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(ServiceError::db_error)?;
    }
    Ok(())
}
