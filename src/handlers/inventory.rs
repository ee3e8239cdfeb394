use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    services::inventory::{
        AdjustStockRequest, ChangeCostRequest, CostChangeOutcome, CreateItemRequest,
        ItemHistoryResponse, ItemResponse, StockAdjustment,
    },
    ApiResponse, AppState, ListQuery, PaginatedResponse,
};

pub fn items_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/:id", get(get_item).delete(delete_item))
        .route("/:id/stock-changes", post(adjust_stock))
        .route("/:id/cost-changes", post(change_cost))
        .route("/:id/history", get(item_history))
}

/// List a tenant's inventory items
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/items",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
    ),
    responses(
        (status = 200, description = "Items retrieved", body = ApiResponse<PaginatedResponse<ItemResponse>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<ItemResponse>>>, ServiceError> {
    let result = state
        .services
        .inventory
        .list_items(tenant_id, query.page, query.limit)
        .await?;
    let total_pages = result.total.div_ceil(query.limit.max(1));

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: result.items,
        total: result.total,
        page: query.page,
        limit: query.limit,
        total_pages,
    })))
}

/// Create an inventory item
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/items",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = ApiResponse<ItemResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(request): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ItemResponse>>), ServiceError> {
    let item = state
        .services
        .inventory
        .create_item(tenant_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(item))))
}

/// Get an inventory item
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/items/{id}",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Item id"),
    ),
    responses(
        (status = 200, description = "Item retrieved", body = ApiResponse<ItemResponse>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<ItemResponse>>, ServiceError> {
    let item = state.services.inventory.get_item(tenant_id, id).await?;
    Ok(Json(ApiResponse::success(item)))
}

/// Delete an inventory item and its ledgers
#[utoipa::path(
    delete,
    path = "/api/v1/tenants/{tenant_id}/items/{id}",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Item id"),
    ),
    responses(
        (status = 200, description = "Item deleted", body = ApiResponse<Value>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    state.services.inventory.delete_item(tenant_id, id).await?;
    Ok(Json(ApiResponse::success(json!({
        "deleted": true,
        "item_id": id,
    }))))
}

/// Apply a stock delta to an item
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/items/{id}/stock-changes",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Item id"),
    ),
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ApiResponse<StockAdjustment>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "items"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(Uuid, Uuid)>,
    Json(request): Json<AdjustStockRequest>,
) -> Result<Json<ApiResponse<StockAdjustment>>, ServiceError> {
    let adjustment = state
        .services
        .inventory
        .adjust_stock(tenant_id, id, request)
        .await?;
    Ok(Json(ApiResponse::success(adjustment)))
}

/// Change an item's unit cost and recalculate dependent mappings
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/items/{id}/cost-changes",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Item id"),
    ),
    request_body = ChangeCostRequest,
    responses(
        (status = 200, description = "Cost changed; cascade report included", body = ApiResponse<CostChangeOutcome>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "items"
)]
pub async fn change_cost(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ChangeCostRequest>,
) -> Result<Json<ApiResponse<CostChangeOutcome>>, ServiceError> {
    let outcome = state
        .services
        .inventory
        .change_cost(tenant_id, id, request)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Full stock and cost history for an item
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/items/{id}/history",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Item id"),
    ),
    responses(
        (status = 200, description = "History retrieved", body = ApiResponse<ItemHistoryResponse>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "items"
)]
pub async fn item_history(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<ItemHistoryResponse>>, ServiceError> {
    let history = state
        .services
        .inventory
        .item_history(tenant_id, id)
        .await?;
    Ok(Json(ApiResponse::success(history)))
}
