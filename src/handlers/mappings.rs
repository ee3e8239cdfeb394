use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    services::mappings::{
        CreateMappingOutcome, CreateMappingRequest, DeleteMappingOutcome, MappingDetailResponse,
        MappingResponse, UpdateMappingRequest,
    },
    ApiResponse, AppState, ListQuery, PaginatedResponse,
};

pub fn mappings_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_mappings).post(create_mapping))
        .route(
            "/:id",
            get(get_mapping).put(update_mapping).delete(delete_mapping),
        )
}

/// List a tenant's SKU mappings
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/mappings",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
    ),
    responses(
        (status = 200, description = "Mappings retrieved", body = ApiResponse<PaginatedResponse<MappingResponse>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "mappings"
)]
pub async fn list_mappings(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<MappingResponse>>>, ServiceError> {
    let result = state
        .services
        .mappings
        .list_mappings(tenant_id, query.page, query.limit)
        .await?;
    let total_pages = result.total.div_ceil(query.limit.max(1));

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items: result.mappings,
        total: result.total,
        page: query.page,
        limit: query.limit,
        total_pages,
    })))
}

/// Create a SKU mapping
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant_id}/mappings",
    params(("tenant_id" = Uuid, Path, description = "Tenant id")),
    request_body = CreateMappingRequest,
    responses(
        (status = 201, description = "Mapping created; pending unresolved SKUs for it are closed", body = ApiResponse<CreateMappingOutcome>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Mapping for SKU already exists", body = crate::errors::ErrorResponse),
    ),
    tag = "mappings"
)]
pub async fn create_mapping(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(request): Json<CreateMappingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateMappingOutcome>>), ServiceError> {
    let outcome = state
        .services
        .mappings
        .create_mapping(tenant_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(outcome))))
}

/// Get a mapping with components and snapshot history
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}/mappings/{id}",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Mapping id"),
    ),
    responses(
        (status = 200, description = "Mapping retrieved", body = ApiResponse<MappingDetailResponse>),
        (status = 404, description = "Mapping not found", body = crate::errors::ErrorResponse),
    ),
    tag = "mappings"
)]
pub async fn get_mapping(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<MappingDetailResponse>>, ServiceError> {
    let detail = state.services.mappings.get_mapping(tenant_id, id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// Update a mapping's SKU, packaging cost or component list
#[utoipa::path(
    put,
    path = "/api/v1/tenants/{tenant_id}/mappings/{id}",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Mapping id"),
    ),
    request_body = UpdateMappingRequest,
    responses(
        (status = 200, description = "Mapping updated and snapshotted", body = ApiResponse<MappingResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Mapping not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Mapping for SKU already exists", body = crate::errors::ErrorResponse),
    ),
    tag = "mappings"
)]
pub async fn update_mapping(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateMappingRequest>,
) -> Result<Json<ApiResponse<MappingResponse>>, ServiceError> {
    let mapping = state
        .services
        .mappings
        .update_mapping(tenant_id, id, request)
        .await?;
    Ok(Json(ApiResponse::success(mapping)))
}

/// Delete a mapping and reopen its unresolved SKUs
#[utoipa::path(
    delete,
    path = "/api/v1/tenants/{tenant_id}/mappings/{id}",
    params(
        ("tenant_id" = Uuid, Path, description = "Tenant id"),
        ("id" = Uuid, Path, description = "Mapping id"),
    ),
    responses(
        (status = 200, description = "Mapping deleted", body = ApiResponse<DeleteMappingOutcome>),
        (status = 404, description = "Mapping not found", body = crate::errors::ErrorResponse),
    ),
    tag = "mappings"
)]
pub async fn delete_mapping(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<DeleteMappingOutcome>>, ServiceError> {
    let outcome = state
        .services
        .mappings
        .delete_mapping(tenant_id, id)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}
