use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_inventory_items_table::Migration),
            Box::new(m20240601_000002_create_stock_ledger_tables::Migration),
            Box::new(m20240601_000003_create_sku_mapping_tables::Migration),
            Box::new(m20240601_000004_create_order_tables::Migration),
            Box::new(m20240601_000005_create_unresolved_skus_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240601_000001_create_inventory_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_inventory_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryItems::TenantId).uuid().not_null())
                        .col(ColumnDef::new(InventoryItems::Sku).string().not_null())
                        .col(ColumnDef::new(InventoryItems::Name).string().not_null())
                        .col(
                            ColumnDef::new(InventoryItems::UnitCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::QuantityOnHand)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_items_tenant_sku")
                        .table(InventoryItems::Table)
                        .col(InventoryItems::TenantId)
                        .col(InventoryItems::Sku)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_items_tenant_name")
                        .table(InventoryItems::Table)
                        .col(InventoryItems::TenantId)
                        .col(InventoryItems::Name)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum InventoryItems {
        Table,
        Id,
        TenantId,
        Sku,
        Name,
        UnitCost,
        QuantityOnHand,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000002_create_stock_ledger_tables {

    use sea_orm_migration::prelude::*;

    use super::m20240601_000001_create_inventory_items_table::InventoryItems;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_stock_ledger_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Append-only stock movement history
            manager
                .create_table(
                    Table::create()
                        .table(StockChanges::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockChanges::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockChanges::ItemId).uuid().not_null())
                        .col(ColumnDef::new(StockChanges::TenantId).uuid().not_null())
                        .col(ColumnDef::new(StockChanges::Delta).integer().not_null())
                        .col(
                            ColumnDef::new(StockChanges::PreviousQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockChanges::NewQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockChanges::Reason).string().not_null())
                        .col(ColumnDef::new(StockChanges::Note).string().null())
                        .col(
                            ColumnDef::new(StockChanges::RecordedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_changes_item_id")
                                .from(StockChanges::Table, StockChanges::ItemId)
                                .to(InventoryItems::Table, InventoryItems::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_changes_item_recorded_at")
                        .table(StockChanges::Table)
                        .col(StockChanges::ItemId)
                        .col(StockChanges::RecordedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_changes_tenant_id")
                        .table(StockChanges::Table)
                        .col(StockChanges::TenantId)
                        .to_owned(),
                )
                .await?;

            // Unit-cost history, same shape with decimal arithmetic
            manager
                .create_table(
                    Table::create()
                        .table(CostChanges::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CostChanges::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CostChanges::ItemId).uuid().not_null())
                        .col(ColumnDef::new(CostChanges::TenantId).uuid().not_null())
                        .col(ColumnDef::new(CostChanges::Delta).decimal().not_null())
                        .col(
                            ColumnDef::new(CostChanges::PreviousCost)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CostChanges::NewCost).decimal().not_null())
                        .col(ColumnDef::new(CostChanges::Reason).string().not_null())
                        .col(ColumnDef::new(CostChanges::Note).string().null())
                        .col(
                            ColumnDef::new(CostChanges::RecordedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cost_changes_item_id")
                                .from(CostChanges::Table, CostChanges::ItemId)
                                .to(InventoryItems::Table, InventoryItems::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_cost_changes_item_recorded_at")
                        .table(CostChanges::Table)
                        .col(CostChanges::ItemId)
                        .col(CostChanges::RecordedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CostChanges::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockChanges::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockChanges {
        Table,
        Id,
        ItemId,
        TenantId,
        Delta,
        PreviousQuantity,
        NewQuantity,
        Reason,
        Note,
        RecordedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum CostChanges {
        Table,
        Id,
        ItemId,
        TenantId,
        Delta,
        PreviousCost,
        NewCost,
        Reason,
        Note,
        RecordedAt,
    }
}

mod m20240601_000003_create_sku_mapping_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_sku_mapping_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SkuMappings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SkuMappings::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SkuMappings::TenantId).uuid().not_null())
                        .col(ColumnDef::new(SkuMappings::Sku).string().not_null())
                        .col(
                            ColumnDef::new(SkuMappings::ManufacturingCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SkuMappings::PackagingCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SkuMappings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SkuMappings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sku_mappings_tenant_sku")
                        .table(SkuMappings::Table)
                        .col(SkuMappings::TenantId)
                        .col(SkuMappings::Sku)
                        .unique()
                        .to_owned(),
                )
                .await?;

            // item_id is a soft reference on purpose: components may dangle
            // after an inventory item is deleted
            manager
                .create_table(
                    Table::create()
                        .table(SkuMappingComponents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SkuMappingComponents::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SkuMappingComponents::MappingId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SkuMappingComponents::ItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SkuMappingComponents::QuantityPerUnit)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sku_mapping_components_mapping_id")
                                .from(
                                    SkuMappingComponents::Table,
                                    SkuMappingComponents::MappingId,
                                )
                                .to(SkuMappings::Table, SkuMappings::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sku_mapping_components_mapping_id")
                        .table(SkuMappingComponents::Table)
                        .col(SkuMappingComponents::MappingId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sku_mapping_components_item_id")
                        .table(SkuMappingComponents::Table)
                        .col(SkuMappingComponents::ItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SkuMappingSnapshots::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SkuMappingSnapshots::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SkuMappingSnapshots::MappingId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SkuMappingSnapshots::TenantId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SkuMappingSnapshots::ManufacturingCost)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SkuMappingSnapshots::PackagingCost)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SkuMappingSnapshots::RecordedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sku_mapping_snapshots_mapping_id")
                                .from(SkuMappingSnapshots::Table, SkuMappingSnapshots::MappingId)
                                .to(SkuMappings::Table, SkuMappings::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sku_mapping_snapshots_mapping_recorded_at")
                        .table(SkuMappingSnapshots::Table)
                        .col(SkuMappingSnapshots::MappingId)
                        .col(SkuMappingSnapshots::RecordedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SkuMappingSnapshots::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SkuMappingComponents::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SkuMappings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum SkuMappings {
        Table,
        Id,
        TenantId,
        Sku,
        ManufacturingCost,
        PackagingCost,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum SkuMappingComponents {
        Table,
        Id,
        MappingId,
        ItemId,
        QuantityPerUnit,
    }

    #[derive(DeriveIden)]
    pub(super) enum SkuMappingSnapshots {
        Table,
        Id,
        MappingId,
        TenantId,
        ManufacturingCost,
        PackagingCost,
        RecordedAt,
    }
}

mod m20240601_000004_create_order_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderRecords::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderRecords::TenantId).uuid().not_null())
                        .col(
                            ColumnDef::new(OrderRecords::ExternalRef)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderRecords::OrderDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderRecords::FulfillmentApplied)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(OrderRecords::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderRecords::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_records_tenant_external_ref")
                        .table(OrderRecords::Table)
                        .col(OrderRecords::TenantId)
                        .col(OrderRecords::ExternalRef)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_records_tenant_applied")
                        .table(OrderRecords::Table)
                        .col(OrderRecords::TenantId)
                        .col(OrderRecords::FulfillmentApplied)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderLineItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderLineItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderLineItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderLineItems::Sku).string().not_null())
                        .col(
                            ColumnDef::new(OrderLineItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_line_items_order_id")
                                .from(OrderLineItems::Table, OrderLineItems::OrderId)
                                .to(OrderRecords::Table, OrderRecords::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_line_items_order_id")
                        .table(OrderLineItems::Table)
                        .col(OrderLineItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderLineItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderRecords::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum OrderRecords {
        Table,
        Id,
        TenantId,
        ExternalRef,
        OrderDate,
        FulfillmentApplied,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum OrderLineItems {
        Table,
        Id,
        OrderId,
        Sku,
        Quantity,
    }
}

mod m20240601_000005_create_unresolved_skus_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000005_create_unresolved_skus_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(UnresolvedSkus::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(UnresolvedSkus::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(UnresolvedSkus::TenantId).uuid().not_null())
                        .col(ColumnDef::new(UnresolvedSkus::Sku).string().not_null())
                        .col(
                            ColumnDef::new(UnresolvedSkus::SourceOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(UnresolvedSkus::Status).string().not_null())
                        .col(
                            ColumnDef::new(UnresolvedSkus::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(UnresolvedSkus::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_unresolved_skus_tenant_sku_order")
                        .table(UnresolvedSkus::Table)
                        .col(UnresolvedSkus::TenantId)
                        .col(UnresolvedSkus::Sku)
                        .col(UnresolvedSkus::SourceOrderId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_unresolved_skus_tenant_status")
                        .table(UnresolvedSkus::Table)
                        .col(UnresolvedSkus::TenantId)
                        .col(UnresolvedSkus::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(UnresolvedSkus::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum UnresolvedSkus {
        Table,
        Id,
        TenantId,
        Sku,
        SourceOrderId,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

