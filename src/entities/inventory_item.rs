use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A raw stock-keeping unit owned by one tenant. Quantity and unit cost are
/// only ever mutated through the ledger, which appends a change record in the
/// same transaction.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Seller-facing identifier, unique per tenant.
    pub sku: String,
    pub name: String,
    /// Current manufacturing cost per unit.
    pub unit_cost: Decimal,
    pub quantity_on_hand: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_change::Entity")]
    StockChanges,
    #[sea_orm(has_many = "super::cost_change::Entity")]
    CostChanges,
}

impl Related<super::stock_change::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockChanges.def()
    }
}

impl Related<super::cost_change::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CostChanges.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
