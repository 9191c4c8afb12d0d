use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::inventory::{
        CreateImportRequest, ImportList, ImportListQuery, ImportStats, UpdateImportRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::InventoryImport,
    response::{ApiResponse, MessageData},
    routes::params::DateRangeQuery,
    services::inventory_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_imports).post(create_import))
        .route("/stats", get(import_stats))
        .route(
            "/{id}",
            get(get_import).put(update_import).delete(delete_import),
        )
}

#[utoipa::path(
    get,
    path = "/api/inventory-imports",
    params(ImportListQuery),
    responses(
        (status = 200, description = "List stock imports, newest first", body = ApiResponse<ImportList>),
        (status = 400, description = "Invalid date range")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Inventory"
)]
pub async fn list_imports(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ImportListQuery>,
) -> AppResult<Json<ApiResponse<ImportList>>> {
    let resp = inventory_service::list_imports(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/inventory-imports/stats",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Import count and total cost", body = ApiResponse<ImportStats>),
        (status = 400, description = "Invalid date range")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Inventory"
)]
pub async fn import_stats(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<ApiResponse<ImportStats>>> {
    let resp = inventory_service::import_stats(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/inventory-imports/{id}",
    params(("id" = Uuid, Path, description = "Import ID")),
    responses(
        (status = 200, description = "Get stock import", body = ApiResponse<InventoryImport>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Inventory"
)]
pub async fn get_import(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<InventoryImport>>> {
    let resp = inventory_service::get_import(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/inventory-imports",
    request_body = CreateImportRequest,
    responses(
        (status = 201, description = "Record a stock import", body = ApiResponse<InventoryImport>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Ingredient not found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Inventory"
)]
pub async fn create_import(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateImportRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<InventoryImport>>)> {
    let resp = inventory_service::create_import(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/inventory-imports/{id}",
    params(("id" = Uuid, Path, description = "Import ID")),
    request_body = UpdateImportRequest,
    responses(
        (status = 200, description = "Update stock import", body = ApiResponse<InventoryImport>),
        (status = 400, description = "Validation error or stock would go negative"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Inventory"
)]
pub async fn update_import(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateImportRequest>,
) -> AppResult<Json<ApiResponse<InventoryImport>>> {
    let resp = inventory_service::update_import(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/inventory-imports/{id}",
    params(("id" = Uuid, Path, description = "Import ID")),
    responses(
        (status = 200, description = "Delete stock import", body = ApiResponse<MessageData>),
        (status = 400, description = "Stock would go negative"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Inventory"
)]
pub async fn delete_import(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MessageData>>> {
    let resp = inventory_service::delete_import(&state, &user, id).await?;
    Ok(Json(resp))
}
