use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::reports::{
        CostReport, DailyRevenueReport, OrdersStatsReport, ProfitReport, RevenueReport,
        TopProductsQuery, TopProductsReport,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::DateRangeQuery,
    services::report_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/revenue", get(revenue))
        .route("/costs", get(costs))
        .route("/profit", get(profit))
        .route("/orders-stats", get(orders_stats))
        .route("/top-products", get(top_products))
        .route("/daily-revenue", get(daily_revenue))
}

#[utoipa::path(
    get,
    path = "/api/reports/revenue",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Revenue of confirmed and done orders", body = ApiResponse<RevenueReport>),
        (status = 400, description = "Missing or invalid date range"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Reports"
)]
pub async fn revenue(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<ApiResponse<RevenueReport>>> {
    let resp = report_service::revenue(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reports/costs",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Ingredient import spend", body = ApiResponse<CostReport>),
        (status = 400, description = "Missing or invalid date range"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Reports"
)]
pub async fn costs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<ApiResponse<CostReport>>> {
    let resp = report_service::costs(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reports/profit",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Revenue minus import spend", body = ApiResponse<ProfitReport>),
        (status = 400, description = "Missing or invalid date range"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Reports"
)]
pub async fn profit(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<ApiResponse<ProfitReport>>> {
    let resp = report_service::profit(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reports/orders-stats",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Order counts by status", body = ApiResponse<OrdersStatsReport>),
        (status = 400, description = "Missing or invalid date range"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Reports"
)]
pub async fn orders_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<ApiResponse<OrdersStatsReport>>> {
    let resp = report_service::orders_stats(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reports/top-products",
    params(TopProductsQuery),
    responses(
        (status = 200, description = "Best selling variants by quantity", body = ApiResponse<TopProductsReport>),
        (status = 400, description = "Missing or invalid date range"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Reports"
)]
pub async fn top_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TopProductsQuery>,
) -> AppResult<Json<ApiResponse<TopProductsReport>>> {
    let resp = report_service::top_products(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reports/daily-revenue",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Revenue per UTC day, gaps filled with zero", body = ApiResponse<DailyRevenueReport>),
        (status = 400, description = "Missing or invalid date range"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Reports"
)]
pub async fn daily_revenue(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<ApiResponse<DailyRevenueReport>>> {
    let resp = report_service::daily_revenue(&state, &user, query).await?;
    Ok(Json(resp))
}
