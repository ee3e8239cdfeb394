use axum::{
    extract::{Path, State},
    response::Json,
    routing::post,
    Router,
};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    services::valuation::{ProfitLossReport, ProfitLossRequest},
    ApiResponse, AppState,
};

pub fn reports_routes() -> Router<AppState> {
    Router::new().route("/profit-loss", post(profit_loss))
}

/// Compute a profit and loss report from a settlement batch
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/reports/profit-loss",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    request_body = ProfitLossRequest,
    responses(
        (status = 200, description = "Per-row and aggregate P&L using costs as of each order date", body = ApiResponse<ProfitLossReport>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "reports"
)]
pub async fn profit_loss(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(request): Json<ProfitLossRequest>,
) -> Result<Json<ApiResponse<ProfitLossReport>>, ServiceError> {
    let report = state
        .services
        .valuation
        .compute_profit_loss(tenant_id, request)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}
