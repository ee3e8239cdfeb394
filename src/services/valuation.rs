use crate::{
    db::DbPool,
    entities::{
        sku_mapping::{self, Entity as SkuMapping},
        sku_mapping_snapshot::{self, Entity as SkuMappingSnapshot},
    },
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// What ultimately happened to a sub-order, parsed from the marketplace's
/// free-text live status. Anything unrecognized is `Unknown` and carries no
/// cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum OrderOutcome {
    Delivered,
    Shipped,
    #[strum(to_string = "Return", serialize = "returned")]
    Return,
    #[strum(to_string = "Rto", serialize = "rto delivered", serialize = "rto_delivered")]
    Rto,
    Unknown,
}

impl OrderOutcome {
    pub fn from_live_status(status: &str) -> Self {
        Self::from_str(status.trim()).unwrap_or(Self::Unknown)
    }
}

/// Cost charged per unit for an outcome. A delivered or shipped unit costs
/// its manufacturing. A unit that came back costs the packaging it burned,
/// plus manufacturing when it came back damaged. Unknown outcomes cost
/// nothing until the status settles.
pub fn unit_cost_for(
    outcome: OrderOutcome,
    damaged: bool,
    manufacturing: Decimal,
    packaging: Decimal,
) -> Decimal {
    match outcome {
        OrderOutcome::Delivered | OrderOutcome::Shipped => manufacturing,
        OrderOutcome::Return | OrderOutcome::Rto => {
            if damaged {
                manufacturing + packaging
            } else {
                packaging
            }
        }
        OrderOutcome::Unknown => Decimal::ZERO,
    }
}

pub fn margin_pct(profit: Decimal, settlement: Decimal) -> Decimal {
    if settlement.is_zero() {
        Decimal::ZERO
    } else {
        profit / settlement.abs() * dec!(100)
    }
}

/// A mapping's snapshot history in recorded order, for point-in-time cost
/// lookup.
#[derive(Debug, Clone, Default)]
pub struct SnapshotTimeline {
    points: Vec<CostPoint>,
}

#[derive(Debug, Clone)]
pub struct CostPoint {
    pub recorded_at: DateTime<Utc>,
    pub manufacturing_cost: Decimal,
    pub packaging_cost: Decimal,
}

impl SnapshotTimeline {
    pub fn new(mut points: Vec<CostPoint>) -> Self {
        points.sort_by_key(|p| p.recorded_at);
        Self { points }
    }

    /// Costs in force at `at`: the latest snapshot not after it. A date
    /// before the first snapshot clamps to the earliest one rather than
    /// pretending the item was ever free.
    pub fn costs_at(&self, at: DateTime<Utc>) -> Option<(Decimal, Decimal)> {
        let idx = self.points.partition_point(|p| p.recorded_at <= at);
        let point = if idx == 0 {
            self.points.first()
        } else {
            self.points.get(idx - 1)
        };
        point.map(|p| (p.manufacturing_cost, p.packaging_cost))
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SettlementRow {
    #[validate(length(min = 1, message = "Sub-order id is required"))]
    pub sub_order_id: String,
    #[validate(length(min = 1, message = "SKU is required"))]
    pub sku: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    /// Net payout for the sub-order. Negative for clawbacks.
    pub settlement_amount: Decimal,
    pub order_date: DateTime<Utc>,
    pub live_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProfitLossRequest {
    #[validate]
    pub settlements: Vec<SettlementRow>,
    /// Sub-orders the seller marked as damaged on return.
    #[serde(default)]
    pub damaged_sub_orders: Vec<String>,
    pub date_range: Option<DateRange>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfitLossRow {
    pub sub_order_id: String,
    pub sku: String,
    pub quantity: i32,
    pub settlement_amount: Decimal,
    pub order_date: DateTime<Utc>,
    pub outcome: String,
    pub damaged: bool,
    /// Per-unit costs taken from the snapshot in force at the order date.
    pub unit_manufacturing_cost: Decimal,
    pub unit_packaging_cost: Decimal,
    pub total_cost: Decimal,
    pub profit: Decimal,
    pub margin_pct: Decimal,
    /// False when no mapping snapshot covered this SKU; such rows carry
    /// zero cost and stay out of the aggregate.
    pub cost_matched: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfitLossSummary {
    pub total_settlement: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub margin_pct: Decimal,
    pub matched_count: usize,
    pub unmatched_count: usize,
    /// Settlement money sitting on rows the aggregate could not cost.
    pub unmatched_revenue: Decimal,
    pub out_of_range: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfitLossReport {
    pub rows: Vec<ProfitLossRow>,
    pub summary: ProfitLossSummary,
}

/// Prices settlement reports against the mapping snapshot history. Costs
/// come from the snapshot in force at each order's date, so later cost
/// changes never rewrite an old month's numbers.
#[derive(Clone)]
pub struct ValuationService {
    db_pool: Arc<DbPool>,
}

impl ValuationService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, settlements = request.settlements.len()))]
    pub async fn compute_profit_loss(
        &self,
        tenant_id: Uuid,
        request: ProfitLossRequest,
    ) -> Result<ProfitLossReport, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        if let Some(range) = &request.date_range {
            if range.from > range.to {
                return Err(ServiceError::ValidationError(
                    "Date range start is after its end".to_string(),
                ));
            }
        }

        let total_rows = request.settlements.len();
        let in_range: Vec<SettlementRow> = request
            .settlements
            .into_iter()
            .filter(|row| match &request.date_range {
                Some(range) => row.order_date >= range.from && row.order_date <= range.to,
                None => true,
            })
            .collect();
        let out_of_range = total_rows - in_range.len();

        let timelines = self.load_timelines(tenant_id, &in_range).await?;
        let damaged: HashSet<&str> = request
            .damaged_sub_orders
            .iter()
            .map(String::as_str)
            .collect();

        let mut rows = Vec::with_capacity(in_range.len());
        let mut summary = ProfitLossSummary {
            total_settlement: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            total_profit: Decimal::ZERO,
            margin_pct: Decimal::ZERO,
            matched_count: 0,
            unmatched_count: 0,
            unmatched_revenue: Decimal::ZERO,
            out_of_range,
        };

        for settlement in in_range {
            let outcome = OrderOutcome::from_live_status(&settlement.live_status);
            let is_damaged = damaged.contains(settlement.sub_order_id.as_str());
            let costs = timelines
                .get(&settlement.sku)
                .and_then(|timeline| timeline.costs_at(settlement.order_date));

            let row = match costs {
                Some((manufacturing, packaging)) => {
                    let unit_cost = unit_cost_for(outcome, is_damaged, manufacturing, packaging);
                    let total_cost = unit_cost * Decimal::from(settlement.quantity);
                    let profit = settlement.settlement_amount - total_cost;

                    summary.total_settlement += settlement.settlement_amount;
                    summary.total_cost += total_cost;
                    summary.total_profit += profit;
                    summary.matched_count += 1;

                    ProfitLossRow {
                        margin_pct: margin_pct(profit, settlement.settlement_amount),
                        sub_order_id: settlement.sub_order_id,
                        sku: settlement.sku,
                        quantity: settlement.quantity,
                        settlement_amount: settlement.settlement_amount,
                        order_date: settlement.order_date,
                        outcome: outcome.to_string(),
                        damaged: is_damaged,
                        unit_manufacturing_cost: manufacturing,
                        unit_packaging_cost: packaging,
                        total_cost,
                        profit,
                        cost_matched: true,
                    }
                }
                None => {
                    summary.unmatched_count += 1;
                    summary.unmatched_revenue += settlement.settlement_amount;

                    ProfitLossRow {
                        margin_pct: Decimal::ZERO,
                        sub_order_id: settlement.sub_order_id,
                        sku: settlement.sku,
                        quantity: settlement.quantity,
                        settlement_amount: settlement.settlement_amount,
                        order_date: settlement.order_date,
                        outcome: outcome.to_string(),
                        damaged: is_damaged,
                        unit_manufacturing_cost: Decimal::ZERO,
                        unit_packaging_cost: Decimal::ZERO,
                        total_cost: Decimal::ZERO,
                        profit: Decimal::ZERO,
                        cost_matched: false,
                    }
                }
            };
            rows.push(row);
        }

        summary.margin_pct = margin_pct(summary.total_profit, summary.total_settlement);

        info!(
            "Profit/loss computed: {} matched, {} unmatched, {} out of range",
            summary.matched_count, summary.unmatched_count, summary.out_of_range
        );

        Ok(ProfitLossReport { rows, summary })
    }

    /// One timeline per SKU present in the report, built from two queries.
    async fn load_timelines(
        &self,
        tenant_id: Uuid,
        settlements: &[SettlementRow],
    ) -> Result<HashMap<String, SnapshotTimeline>, ServiceError> {
        let skus: Vec<String> = settlements
            .iter()
            .map(|s| s.sku.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if skus.is_empty() {
            return Ok(HashMap::new());
        }

        let db = &*self.db_pool;
        let mappings = SkuMapping::find()
            .filter(sku_mapping::Column::TenantId.eq(tenant_id))
            .filter(sku_mapping::Column::Sku.is_in(skus))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        if mappings.is_empty() {
            return Ok(HashMap::new());
        }

        let sku_by_mapping: HashMap<Uuid, String> =
            mappings.into_iter().map(|m| (m.id, m.sku)).collect();
        let mapping_ids: Vec<Uuid> = sku_by_mapping.keys().copied().collect();

        let snapshots = SkuMappingSnapshot::find()
            .filter(sku_mapping_snapshot::Column::MappingId.is_in(mapping_ids))
            .order_by_asc(sku_mapping_snapshot::Column::RecordedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut points_by_sku: HashMap<String, Vec<CostPoint>> = HashMap::new();
        for snapshot in snapshots {
            if let Some(sku) = sku_by_mapping.get(&snapshot.mapping_id) {
                points_by_sku
                    .entry(sku.clone())
                    .or_default()
                    .push(CostPoint {
                        recorded_at: snapshot.recorded_at,
                        manufacturing_cost: snapshot.manufacturing_cost,
                        packaging_cost: snapshot.packaging_cost,
                    });
            }
        }

        Ok(points_by_sku
            .into_iter()
            .map(|(sku, points)| (sku, SnapshotTimeline::new(points)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap()
    }

    #[test_case("Delivered" => OrderOutcome::Delivered)]
    #[test_case("SHIPPED" => OrderOutcome::Shipped)]
    #[test_case("return" => OrderOutcome::Return)]
    #[test_case("Returned" => OrderOutcome::Return)]
    #[test_case("RTO" => OrderOutcome::Rto)]
    #[test_case("RTO Delivered" => OrderOutcome::Rto)]
    #[test_case("cancelled" => OrderOutcome::Unknown)]
    #[test_case("  delivered  " => OrderOutcome::Delivered; "delivered with surrounding whitespace")]
    fn live_status_parses(status: &str) -> OrderOutcome {
        OrderOutcome::from_live_status(status)
    }

    #[test_case(OrderOutcome::Delivered, false => dec!(7.00); "delivered costs manufacturing")]
    #[test_case(OrderOutcome::Shipped, false => dec!(7.00); "shipped costs manufacturing")]
    #[test_case(OrderOutcome::Return, false => dec!(1.25); "clean return costs packaging")]
    #[test_case(OrderOutcome::Rto, false => dec!(1.25); "clean rto costs packaging")]
    #[test_case(OrderOutcome::Return, true => dec!(8.25); "damaged return costs both")]
    #[test_case(OrderOutcome::Rto, true => dec!(8.25); "damaged rto costs both")]
    #[test_case(OrderOutcome::Unknown, false => Decimal::ZERO; "unknown costs nothing")]
    fn outcome_cost_matrix(outcome: OrderOutcome, damaged: bool) -> Decimal {
        unit_cost_for(outcome, damaged, dec!(7.00), dec!(1.25))
    }

    #[test]
    fn margin_is_zero_when_settlement_is_zero() {
        assert_eq!(margin_pct(dec!(5.00), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn margin_uses_absolute_settlement() {
        assert_eq!(margin_pct(dec!(-3.00), dec!(-12.00)), dec!(-25));
    }

    #[test]
    fn timeline_picks_latest_snapshot_not_after_date() {
        let timeline = SnapshotTimeline::new(vec![
            CostPoint {
                recorded_at: at(1),
                manufacturing_cost: dec!(5.00),
                packaging_cost: dec!(1.00),
            },
            CostPoint {
                recorded_at: at(10),
                manufacturing_cost: dec!(6.00),
                packaging_cost: dec!(1.00),
            },
            CostPoint {
                recorded_at: at(20),
                manufacturing_cost: dec!(7.00),
                packaging_cost: dec!(1.50),
            },
        ]);

        assert_eq!(timeline.costs_at(at(15)), Some((dec!(6.00), dec!(1.00))));
        assert_eq!(timeline.costs_at(at(25)), Some((dec!(7.00), dec!(1.50))));
        assert_eq!(timeline.costs_at(at(10)), Some((dec!(6.00), dec!(1.00))));
    }

    #[test]
    fn timeline_clamps_to_earliest_snapshot() {
        let timeline = SnapshotTimeline::new(vec![CostPoint {
            recorded_at: at(10),
            manufacturing_cost: dec!(6.00),
            packaging_cost: dec!(1.00),
        }]);

        assert_eq!(timeline.costs_at(at(2)), Some((dec!(6.00), dec!(1.00))));
    }

    #[test]
    fn empty_timeline_matches_nothing() {
        let timeline = SnapshotTimeline::default();
        assert_eq!(timeline.costs_at(at(5)), None);
        assert!(timeline.is_empty());
    }

    #[test]
    fn timeline_sorts_unordered_points() {
        let timeline = SnapshotTimeline::new(vec![
            CostPoint {
                recorded_at: at(20),
                manufacturing_cost: dec!(7.00),
                packaging_cost: dec!(1.50),
            },
            CostPoint {
                recorded_at: at(1),
                manufacturing_cost: dec!(5.00),
                packaging_cost: dec!(1.00),
            },
        ]);

        assert_eq!(timeline.costs_at(at(3)), Some((dec!(5.00), dec!(1.00))));
    }
}
