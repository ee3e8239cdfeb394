use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        cascade::CascadeService, fulfillment::FulfillmentService, inventory::InventoryService,
        mappings::MappingService, orders::OrderService, valuation::ValuationService,
    },
};

/// Factory for creating service instances with shared dependencies
pub struct ServiceFactory {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    stock_floor: i32,
}

impl ServiceFactory {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, stock_floor: i32) -> Self {
        Self {
            db_pool,
            event_sender,
            stock_floor,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self::new(db_pool, event_sender, config.stock_floor)
    }

    pub fn cascade_service(&self) -> CascadeService {
        CascadeService::new(self.db_pool.clone(), self.event_sender.clone())
    }

    pub fn inventory_service(&self, cascade: Arc<CascadeService>) -> InventoryService {
        InventoryService::new(self.db_pool.clone(), self.event_sender.clone(), cascade)
    }

    pub fn mapping_service(&self) -> MappingService {
        MappingService::new(self.db_pool.clone(), self.event_sender.clone())
    }

    pub fn order_service(&self) -> OrderService {
        OrderService::new(self.db_pool.clone(), self.event_sender.clone())
    }

    pub fn fulfillment_service(&self) -> FulfillmentService {
        FulfillmentService::new(
            self.db_pool.clone(),
            self.event_sender.clone(),
            self.stock_floor,
        )
    }

    pub fn valuation_service(&self) -> ValuationService {
        ValuationService::new(self.db_pool.clone())
    }

    pub fn db_pool(&self) -> &Arc<DbPool> {
        &self.db_pool
    }

    pub fn event_sender(&self) -> &Arc<EventSender> {
        &self.event_sender
    }
}

/// Service container holding all service instances
#[derive(Clone)]
pub struct ServiceContainer {
    pub inventory: Arc<InventoryService>,
    pub mappings: Arc<MappingService>,
    pub cascade: Arc<CascadeService>,
    pub orders: Arc<OrderService>,
    pub fulfillment: Arc<FulfillmentService>,
    pub valuation: Arc<ValuationService>,
}

impl ServiceContainer {
    pub fn new(factory: &ServiceFactory) -> Self {
        let cascade = Arc::new(factory.cascade_service());

        Self {
            inventory: Arc::new(factory.inventory_service(cascade.clone())),
            mappings: Arc::new(factory.mapping_service()),
            cascade,
            orders: Arc::new(factory.order_service()),
            fulfillment: Arc::new(factory.fulfillment_service()),
            valuation: Arc::new(factory.valuation_service()),
        }
    }
}
