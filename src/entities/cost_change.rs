use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::stock_change::ChangeReason;

/// Append-only unit-cost movement for an inventory item. Mirrors
/// `stock_change` with decimal arithmetic: `new_cost` always equals
/// `previous_cost + delta`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cost_changes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_id: Uuid,
    pub tenant_id: Uuid,
    pub delta: Decimal,
    pub previous_cost: Decimal,
    pub new_cost: Decimal,
    pub reason: ChangeReason,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_item::Entity",
        from = "Column::ItemId",
        to = "super::inventory_item::Column::Id"
    )]
    InventoryItem,
}

impl Related<super::inventory_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn balances(&self) -> bool {
        self.previous_cost + self.delta == self.new_cost
    }
}
