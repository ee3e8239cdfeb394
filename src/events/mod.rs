use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// The audit trail of the system. Every committed mutation emits one of these
// after its transaction; a failed send is logged and never undoes the
// mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Inventory item lifecycle
    ItemCreated {
        tenant_id: Uuid,
        item_id: Uuid,
        sku: String,
    },
    ItemDeleted {
        tenant_id: Uuid,
        item_id: Uuid,
        stock_records_removed: u64,
        cost_records_removed: u64,
    },

    // Ledger events
    StockAdjusted {
        tenant_id: Uuid,
        item_id: Uuid,
        delta: i32,
        previous_quantity: i32,
        new_quantity: i32,
        reason: String,
        change_id: Uuid,
    },
    CostChanged {
        tenant_id: Uuid,
        item_id: Uuid,
        delta: Decimal,
        previous_cost: Decimal,
        new_cost: Decimal,
        change_id: Uuid,
    },

    // Mapping events
    MappingCreated {
        tenant_id: Uuid,
        mapping_id: Uuid,
        sku: String,
        manufacturing_cost: Decimal,
        unresolved_resolved: u64,
    },
    MappingUpdated {
        tenant_id: Uuid,
        mapping_id: Uuid,
        sku: String,
        manufacturing_cost: Decimal,
    },
    MappingDeleted {
        tenant_id: Uuid,
        mapping_id: Uuid,
        sku: String,
        unresolved_reopened: u64,
    },
    MappingRecalculated {
        tenant_id: Uuid,
        mapping_id: Uuid,
        previous_cost: Decimal,
        new_cost: Decimal,
    },

    // Order pipeline events
    OrdersIngested {
        tenant_id: Uuid,
        created: usize,
        skipped: usize,
    },
    FulfillmentApplied {
        tenant_id: Uuid,
        orders_applied: usize,
        orders_skipped: usize,
        items_deducted: usize,
        unresolved_skus: usize,
        shortfalls: usize,
    },
    UnresolvedSkuRecorded {
        tenant_id: Uuid,
        sku: String,
        source_order_id: Uuid,
    },

    // Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

impl Event {
    /// Create a generic event with string data
    pub fn with_data(data: String) -> Self {
        Event::Generic {
            message: data,
            timestamp: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }
}

// Define a trait for handling events. Handlers implementing this trait will process events asynchronously.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: Event) -> Result<(), String>;
}

// Function to process incoming events and render them into the audit log.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::ItemCreated {
                tenant_id,
                item_id,
                sku,
            } => {
                info!(
                    "Inventory item created: tenant={}, item={}, sku={}",
                    tenant_id, item_id, sku
                );
            }
            Event::ItemDeleted {
                tenant_id,
                item_id,
                stock_records_removed,
                cost_records_removed,
            } => {
                info!(
                    "Inventory item deleted with its history: tenant={}, item={}, stock_records={}, cost_records={}",
                    tenant_id, item_id, stock_records_removed, cost_records_removed
                );
            }
            Event::StockAdjusted {
                tenant_id,
                item_id,
                delta,
                previous_quantity,
                new_quantity,
                reason,
                change_id,
            } => {
                if let Err(e) = handle_stock_adjusted(
                    tenant_id,
                    item_id,
                    delta,
                    previous_quantity,
                    new_quantity,
                    &reason,
                    change_id,
                )
                .await
                {
                    error!(
                        "Failed to handle stock adjustment event: item={}, error={}",
                        item_id, e
                    );
                }
            }
            Event::CostChanged {
                tenant_id,
                item_id,
                delta,
                previous_cost,
                new_cost,
                change_id,
            } => {
                info!(
                    "Unit cost changed: tenant={}, item={}, {} -> {} (delta {}), record={}",
                    tenant_id, item_id, previous_cost, new_cost, delta, change_id
                );
            }
            Event::MappingCreated {
                tenant_id,
                mapping_id,
                sku,
                manufacturing_cost,
                unresolved_resolved,
            } => {
                info!(
                    "SKU mapping created: tenant={}, mapping={}, sku={}, manufacturing_cost={}",
                    tenant_id, mapping_id, sku, manufacturing_cost
                );
                if unresolved_resolved > 0 {
                    info!(
                        "Mapping for {} resolved {} pending unresolved SKU record(s)",
                        sku, unresolved_resolved
                    );
                }
            }
            Event::MappingUpdated {
                tenant_id,
                mapping_id,
                sku,
                manufacturing_cost,
            } => {
                info!(
                    "SKU mapping updated: tenant={}, mapping={}, sku={}, manufacturing_cost={}",
                    tenant_id, mapping_id, sku, manufacturing_cost
                );
            }
            Event::MappingDeleted {
                tenant_id,
                mapping_id,
                sku,
                unresolved_reopened,
            } => {
                info!(
                    "SKU mapping deleted: tenant={}, mapping={}, sku={}",
                    tenant_id, mapping_id, sku
                );
                if unresolved_reopened > 0 {
                    warn!(
                        "Deleting mapping for {} reopened {} unresolved SKU record(s)",
                        sku, unresolved_reopened
                    );
                }
            }
            Event::MappingRecalculated {
                tenant_id,
                mapping_id,
                previous_cost,
                new_cost,
            } => {
                info!(
                    "Mapping cost recalculated: tenant={}, mapping={}, {} -> {}",
                    tenant_id, mapping_id, previous_cost, new_cost
                );
            }
            Event::OrdersIngested {
                tenant_id,
                created,
                skipped,
            } => {
                info!(
                    "Order batch ingested: tenant={}, created={}, skipped={}",
                    tenant_id, created, skipped
                );
            }
            Event::FulfillmentApplied {
                tenant_id,
                orders_applied,
                orders_skipped,
                items_deducted,
                unresolved_skus,
                shortfalls,
            } => {
                if let Err(e) = handle_fulfillment_applied(
                    tenant_id,
                    orders_applied,
                    orders_skipped,
                    items_deducted,
                    unresolved_skus,
                    shortfalls,
                )
                .await
                {
                    error!(
                        "Failed to handle fulfillment event: tenant={}, error={}",
                        tenant_id, e
                    );
                }
            }
            Event::UnresolvedSkuRecorded {
                tenant_id,
                sku,
                source_order_id,
            } => {
                warn!(
                    "Unresolved SKU recorded for follow-up: tenant={}, sku={}, order={}",
                    tenant_id, sku, source_order_id
                );
            }
            Event::Generic {
                message,
                timestamp,
                metadata,
            } => {
                info!(
                    "Generic event at {}: {} (metadata: {})",
                    timestamp, message, metadata
                );
            }
        }
    }

    info!("Event processing loop stopped");
}

async fn handle_stock_adjusted(
    tenant_id: Uuid,
    item_id: Uuid,
    delta: i32,
    previous_quantity: i32,
    new_quantity: i32,
    reason: &str,
    change_id: Uuid,
) -> Result<(), String> {
    info!(
        "Stock adjusted: tenant={}, item={}, {} -> {} (delta {}), reason={}, record={}",
        tenant_id, item_id, previous_quantity, new_quantity, delta, reason, change_id
    );

    if new_quantity <= 0 && delta < 0 {
        warn!(
            "Stock exhausted: item {} is at {} after deduction",
            item_id, new_quantity
        );
    }

    Ok(())
}

async fn handle_fulfillment_applied(
    tenant_id: Uuid,
    orders_applied: usize,
    orders_skipped: usize,
    items_deducted: usize,
    unresolved_skus: usize,
    shortfalls: usize,
) -> Result<(), String> {
    info!(
        "Fulfillment batch applied: tenant={}, applied={}, skipped={}, items_deducted={}",
        tenant_id, orders_applied, orders_skipped, items_deducted
    );

    if unresolved_skus > 0 {
        warn!(
            "Fulfillment left {} SKU(s) unresolved for tenant {}",
            unresolved_skus, tenant_id
        );
    }

    if shortfalls > 0 {
        warn!(
            "Fulfillment clamped {} deduction(s) at the stock floor for tenant {}",
            shortfalls, tenant_id
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::with_data("hello".into()))
            .await
            .expect("send should succeed");

        match rx.recv().await {
            Some(Event::Generic { message, .. }) => assert_eq!(message, "hello"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender.send(Event::with_data("orphaned".into())).await;
        assert!(result.is_err());
    }
}
