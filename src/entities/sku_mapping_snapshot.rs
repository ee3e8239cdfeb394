use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Point-in-time capture of a mapping's cost pair, appended whenever the
/// mapping is explicitly edited or a component cost change flows through the
/// cascade. Valuation reads these, never the live mapping, so historical
/// orders keep the cost that was current when they were placed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sku_mapping_snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub mapping_id: Uuid,
    pub tenant_id: Uuid,
    pub manufacturing_cost: Decimal,
    pub packaging_cost: Decimal,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sku_mapping::Entity",
        from = "Column::MappingId",
        to = "super::sku_mapping::Column::Id"
    )]
    SkuMapping,
}

impl Related<super::sku_mapping::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SkuMapping.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn total_unit_cost(&self) -> Decimal {
        self.manufacturing_cost + self.packaging_cost
    }
}
