use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Why a ledger record was written.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ChangeReason {
    /// First value recorded when the item is created.
    #[sea_orm(string_value = "initial")]
    Initial,
    /// Explicit adjustment by the seller.
    #[sea_orm(string_value = "manual-update")]
    ManualUpdate,
    /// Deduction applied by the fulfillment resolver.
    #[sea_orm(string_value = "order-fulfillment")]
    OrderFulfillment,
}

/// Append-only stock movement. `new_quantity` always equals
/// `previous_quantity + delta`; rows are never updated after insert and are
/// deleted only when the owning item is deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_changes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_id: Uuid,
    pub tenant_id: Uuid,
    /// Signed quantity applied to the item. Negative for deductions.
    pub delta: i32,
    pub previous_quantity: i32,
    pub new_quantity: i32,
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
    /// True when the record's arithmetic is internally consistent.
    pub fn balances(&self) -> bool {
        self.previous_quantity + self.delta == self.new_quantity
    }

    pub fn is_deduction(&self) -> bool {
        self.delta < 0
    }
}
