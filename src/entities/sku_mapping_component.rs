use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One inventory item consumed by a mapped SKU, with how many units each
/// sale uses. `item_id` is a soft reference: deleting the item leaves the
/// component dangling, and recalculation treats it as contributing zero.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sku_mapping_components")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub mapping_id: Uuid,
    pub item_id: Uuid,
    pub quantity_per_unit: i32,
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
