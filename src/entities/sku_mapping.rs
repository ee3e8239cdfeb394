use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Maps a marketplace-facing SKU to the inventory items consumed per unit
/// sold. `manufacturing_cost` is derived from the component items' current
/// costs and is never set by callers; `packaging_cost` is the only directly
/// settable cost field.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sku_mappings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Marketplace SKU, unique per tenant.
    pub sku: String,
    pub manufacturing_cost: Decimal,
    pub packaging_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sku_mapping_component::Entity")]
    Components,
    #[sea_orm(has_many = "super::sku_mapping_snapshot::Entity")]
    Snapshots,
}

impl Related<super::sku_mapping_component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Components.def()
    }
}

impl Related<super::sku_mapping_snapshot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Snapshots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Cost charged when a damaged return comes back unsellable.
    pub fn total_unit_cost(&self) -> Decimal {
        self.manufacturing_cost + self.packaging_cost
    }
}
