use axum::{
    extract::{Path, State},
    response::Json,
    routing::post,
    Router,
};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    services::fulfillment::{ApplyFulfillmentRequest, FulfillmentOutcome},
    ApiResponse, AppState,
};

pub fn fulfillment_routes() -> Router<AppState> {
    Router::new().route("/apply", post(apply_fulfillment))
}

/// Resolve unapplied orders against the catalog and deduct stock
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/fulfillment/apply",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    request_body = ApplyFulfillmentRequest,
    responses(
        (status = 200, description = "Fulfillment applied atomically", body = ApiResponse<FulfillmentOutcome>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "A requested order was not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "fulfillment"
)]
pub async fn apply_fulfillment(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(request): Json<ApplyFulfillmentRequest>,
) -> Result<Json<ApiResponse<FulfillmentOutcome>>, ServiceError> {
    let outcome = state
        .services
        .fulfillment
        .resolve_and_apply(tenant_id, request)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}
