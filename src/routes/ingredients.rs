use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::ingredients::{
        CreateIngredientRequest, IngredientList, IngredientListQuery, UpdateIngredientRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Ingredient,
    response::{ApiResponse, MessageData},
    services::ingredient_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_ingredients).post(create_ingredient))
        .route("/active", get(list_active_ingredients))
        .route(
            "/{id}",
            get(get_ingredient)
                .put(update_ingredient)
                .delete(delete_ingredient),
        )
}

#[utoipa::path(
    get,
    path = "/api/ingredients",
    params(IngredientListQuery),
    responses(
        (status = 200, description = "List ingredients", body = ApiResponse<IngredientList>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Ingredients"
)]
pub async fn list_ingredients(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<IngredientListQuery>,
) -> AppResult<Json<ApiResponse<IngredientList>>> {
    let resp = ingredient_service::list_ingredients(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/ingredients/active",
    responses(
        (status = 200, description = "All active ingredients ordered by name", body = ApiResponse<IngredientList>)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Ingredients"
)]
pub async fn list_active_ingredients(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<ApiResponse<IngredientList>>> {
    let resp = ingredient_service::list_active_ingredients(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/ingredients/{id}",
    params(("id" = Uuid, Path, description = "Ingredient ID")),
    responses(
        (status = 200, description = "Get ingredient", body = ApiResponse<Ingredient>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Ingredients"
)]
pub async fn get_ingredient(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Ingredient>>> {
    let resp = ingredient_service::get_ingredient(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/ingredients",
    request_body = CreateIngredientRequest,
    responses(
        (status = 201, description = "Create ingredient", body = ApiResponse<Ingredient>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Ingredients"
)]
pub async fn create_ingredient(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateIngredientRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Ingredient>>)> {
    let resp = ingredient_service::create_ingredient(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/ingredients/{id}",
    params(("id" = Uuid, Path, description = "Ingredient ID")),
    request_body = UpdateIngredientRequest,
    responses(
        (status = 200, description = "Update ingredient", body = ApiResponse<Ingredient>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Ingredients"
)]
pub async fn update_ingredient(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateIngredientRequest>,
) -> AppResult<Json<ApiResponse<Ingredient>>> {
    let resp = ingredient_service::update_ingredient(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/ingredients/{id}",
    params(("id" = Uuid, Path, description = "Ingredient ID")),
    responses(
        (status = 200, description = "Delete ingredient", body = ApiResponse<MessageData>),
        (status = 400, description = "Ingredient has import history"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Ingredients"
)]
pub async fn delete_ingredient(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MessageData>>> {
    let resp = ingredient_service::delete_ingredient(&state, &user, id).await?;
    Ok(Json(resp))
}
