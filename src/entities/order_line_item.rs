use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_line_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub sku: String,
    pub quantity: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order_record::Entity",
        from = "Column::OrderId",
        to = "super::order_record::Column::Id"
    )]
    OrderRecord,
}

impl Related<super::order_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
