use axum::{response::Json, routing::get, Router};
use utoipa::OpenApi;

use crate::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stockbook API",
        version = "1.0.0",
        description = r#"
# Stockbook Inventory Consistency & Valuation API

An API for e-commerce sellers that keeps inventory quantities and unit costs
consistent across catalog changes, marketplace order flows, and financial
reporting.

## Features

- **Append-only ledgers**: Every stock and cost movement is recorded as an immutable change entry
- **SKU mappings**: Marketplace listings resolve to bundles of catalog items with derived manufacturing cost
- **Cascade recalculation**: Item cost changes recompute every mapping built from that item and snapshot the result
- **Fulfillment resolution**: Raw orders deduct stock through mappings with floor clamping and shortfall reporting
- **Point-in-time valuation**: Profit and loss uses the mapping cost as of each order date, not today's cost

## Error Handling

The API uses consistent error response formats with appropriate HTTP status codes:

```json
{
  "success": false,
  "error": "Bad Request",
  "message": "Validation failed",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints support pagination with the following query parameters:
- `page`: Page number (default: 1)
- `limit`: Items per page (default: 20)
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "items", description = "Catalog items and their stock/cost ledgers"),
        (name = "mappings", description = "SKU mapping management and cost snapshots"),
        (name = "orders", description = "Order ingestion and inspection"),
        (name = "fulfillment", description = "Order-to-inventory fulfillment application"),
        (name = "reports", description = "Profit and loss valuation reports")
    ),
    paths(
        // Items
        crate::handlers::inventory::list_items,
        crate::handlers::inventory::create_item,
        crate::handlers::inventory::get_item,
        crate::handlers::inventory::delete_item,
        crate::handlers::inventory::adjust_stock,
        crate::handlers::inventory::change_cost,
        crate::handlers::inventory::item_history,

        // Mappings
        crate::handlers::mappings::list_mappings,
        crate::handlers::mappings::create_mapping,
        crate::handlers::mappings::get_mapping,
        crate::handlers::mappings::update_mapping,
        crate::handlers::mappings::delete_mapping,

        // Orders
        crate::handlers::orders::ingest_orders,
        crate::handlers::orders::list_unapplied,
        crate::handlers::orders::list_unresolved,
        crate::handlers::orders::get_order,

        // Fulfillment
        crate::handlers::fulfillment::apply_fulfillment,

        // Reports
        crate::handlers::reports::profit_loss,

        // Status & health intentionally omitted from OpenAPI paths
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::ListQuery,

            // Item types
            crate::services::inventory::CreateItemRequest,
            crate::services::inventory::AdjustStockRequest,
            crate::services::inventory::ChangeCostRequest,
            crate::services::inventory::ItemResponse,
            crate::services::inventory::StockChangeResponse,
            crate::services::inventory::CostChangeResponse,
            crate::services::inventory::StockAdjustment,
            crate::services::inventory::CostChangeOutcome,
            crate::services::inventory::ItemHistoryResponse,

            // Mapping types
            crate::services::mappings::ComponentInput,
            crate::services::mappings::CreateMappingRequest,
            crate::services::mappings::UpdateMappingRequest,
            crate::services::mappings::MappingResponse,
            crate::services::mappings::ComponentResponse,
            crate::services::mappings::SnapshotResponse,
            crate::services::mappings::MappingDetailResponse,
            crate::services::mappings::CreateMappingOutcome,
            crate::services::mappings::DeleteMappingOutcome,
            crate::services::cascade::CascadeReport,
            crate::services::cascade::CascadeFailure,

            // Order types
            crate::services::orders::IngestLineItem,
            crate::services::orders::IngestOrder,
            crate::services::orders::IngestOrdersRequest,
            crate::services::orders::IngestOutcome,
            crate::services::orders::LineItemResponse,
            crate::services::orders::OrderResponse,
            crate::services::orders::UnresolvedSkuResponse,

            // Fulfillment types
            crate::services::fulfillment::ApplyFulfillmentRequest,
            crate::services::fulfillment::UnresolvedLine,
            crate::services::fulfillment::Shortfall,
            crate::services::fulfillment::FulfillmentOutcome,

            // Valuation types
            crate::services::valuation::SettlementRow,
            crate::services::valuation::DateRange,
            crate::services::valuation::ProfitLossRequest,
            crate::services::valuation::ProfitLossRow,
            crate::services::valuation::ProfitLossSummary,
            crate::services::valuation::ProfitLossReport,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated document as plain JSON
pub fn docs_routes() -> Router<AppState> {
    Router::new().route("/api-docs/openapi.json", get(serve_openapi))
}

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).expect("document should serialize");
        assert!(json.contains("Stockbook API"));
        assert!(json.contains("/api/v1/tenants/{tenant_id}/items"));
        assert!(json.contains("/api/v1/tenants/{tenant_id}/fulfillment/apply"));
    }
}
