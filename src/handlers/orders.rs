use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    services::orders::{IngestOrdersRequest, IngestOutcome, OrderResponse, UnresolvedSkuResponse},
    ApiResponse, AppState,
};

pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/ingest", post(ingest_orders))
        .route("/unapplied", get(list_unapplied))
        .route("/unresolved-skus", get(list_unresolved))
        .route("/:id", get(get_order))
}

/// Ingest a batch of marketplace orders
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/orders/ingest",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    request_body = IngestOrdersRequest,
    responses(
        (status = 201, description = "Batch ingested; duplicate external refs skipped", body = ApiResponse<IngestOutcome>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn ingest_orders(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(request): Json<IngestOrdersRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IngestOutcome>>), ServiceError> {
    let outcome = state
        .services
        .orders
        .ingest_orders(tenant_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(outcome))))
}

/// List orders not yet applied to inventory
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/orders/unapplied",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    responses(
        (status = 200, description = "Unapplied orders in order-date order", body = ApiResponse<Vec<OrderResponse>>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn list_unapplied(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ServiceError> {
    let orders = state.services.orders.list_unapplied(tenant_id).await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// List SKUs fulfillment could not resolve
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/orders/unresolved-skus",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    responses(
        (status = 200, description = "Pending unresolved SKUs", body = ApiResponse<Vec<UnresolvedSkuResponse>>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn list_unresolved(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<UnresolvedSkuResponse>>>, ServiceError> {
    let pending = state.services.orders.list_unresolved(tenant_id).await?;
    Ok(Json(ApiResponse::success(pending)))
}

/// Get a single order with its line items
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/orders/{id}",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Order id"),
    ),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.get_order(tenant_id, id).await?;
    Ok(Json(ApiResponse::success(order)))
}
