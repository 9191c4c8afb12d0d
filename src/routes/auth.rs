use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};

use crate::{
    dto::auth::{AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest},
    error::AppResult,
    middleware::auth::{AuthUser, auth_cookie, clear_auth_cookie},
    models::User,
    response::{ApiResponse, MessageData, Meta},
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/change-password", post(change_password))
}

fn session_cookie(state: &AppState, resp: &ApiResponse<AuthResponse>) -> String {
    let token = resp.data.as_ref().map(|d| d.token.as_str()).unwrap_or_default();
    auth_cookie(token, state.config.token_ttl_secs(), state.config.cookie_secure)
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register a STAFF account", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Validation error")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let resp = auth_service::register_user(&state, payload).await?;
    let cookie = session_cookie(&state, &resp);
    Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account inactive")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let resp = auth_service::login_user(&state, payload).await?;
    let cookie = session_cookie(&state, &resp);
    Ok(([(header::SET_COOKIE, cookie)], Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Clear the session cookie", body = ApiResponse<MessageData>)
    ),
    tag = "Auth"
)]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = clear_auth_cookie(state.config.cookie_secure);
    let body = ApiResponse::success(
        "Logged out",
        MessageData::new("Logged out successfully"),
        Some(Meta::empty()),
    );
    ([(header::SET_COOKIE, cookie)], Json(body))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<User>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = auth_service::current_user(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<MessageData>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Current password is wrong")
    ),
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    tag = "Auth"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<MessageData>>> {
    let resp = auth_service::change_password(&state, &user, payload).await?;
    Ok(Json(resp))
}
