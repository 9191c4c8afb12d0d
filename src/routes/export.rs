use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    error::AppResult,
    excel::XLSX_CONTENT_TYPE,
    middleware::auth::AuthUser,
    routes::params::DateRangeQuery,
    services::export_service::{self, ExportFile},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(export_orders))
        .route("/revenue", get(export_revenue))
        .route("/customers", get(export_customers))
        .route("/products", get(export_products))
        .route("/inventory-imports", get(export_inventory_imports))
}

impl IntoResponse for ExportFile {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        let mut resp = self.bytes.into_response();
        let headers = resp.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(XLSX_CONTENT_TYPE),
        );
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
        resp
    }
}

#[utoipa::path(
    get,
    path = "/api/export/orders",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Orders workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", body = Vec<u8>),
        (status = 400, description = "Missing or invalid date range"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Export"
)]
pub async fn export_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<ExportFile> {
    export_service::export_orders(&state, &user, query).await
}

#[utoipa::path(
    get,
    path = "/api/export/revenue",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Revenue workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", body = Vec<u8>),
        (status = 400, description = "Missing or invalid date range"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Export"
)]
pub async fn export_revenue(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<ExportFile> {
    export_service::export_revenue(&state, &user, query).await
}

#[utoipa::path(
    get,
    path = "/api/export/customers",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Customers workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", body = Vec<u8>),
        (status = 400, description = "Only one date bound given"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Export"
)]
pub async fn export_customers(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<ExportFile> {
    export_service::export_customers(&state, &user, query).await
}

#[utoipa::path(
    get,
    path = "/api/export/products",
    responses(
        (status = 200, description = "Products and variants workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", body = Vec<u8>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Export"
)]
pub async fn export_products(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<ExportFile> {
    export_service::export_products(&state, &user).await
}

#[utoipa::path(
    get,
    path = "/api/export/inventory-imports",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Stock imports workbook", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet", body = Vec<u8>),
        (status = 400, description = "Missing or invalid date range"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Export"
)]
pub async fn export_inventory_imports(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<ExportFile> {
    export_service::export_inventory_imports(&state, &user, query).await
}
