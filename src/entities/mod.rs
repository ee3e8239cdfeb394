pub mod cost_change;
pub mod inventory_item;
pub mod order_line_item;
pub mod order_record;
pub mod sku_mapping;
pub mod sku_mapping_component;
pub mod sku_mapping_snapshot;
pub mod stock_change;
pub mod unresolved_sku;
