pub mod fulfillment;
pub mod inventory;
pub mod mappings;
pub mod orders;
pub mod reports;
