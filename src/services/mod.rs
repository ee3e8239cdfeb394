// Ledger and mapping graph
pub mod cascade;
pub mod inventory;
pub mod mappings;

// Order pipeline
pub mod fulfillment;
pub mod orders;

// Reporting
pub mod valuation;

// Service factory for dependency injection
pub mod factory;
