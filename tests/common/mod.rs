#![allow(dead_code)]

use shop_backoffice::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    entity::users::Role,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::auth_service::hash_password,
    state::AppState,
};
use uuid::Uuid;

/// Connects to the test database, or returns `None` so the caller can skip.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let config = AppConfig {
        database_url: database_url.clone(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "flow-test-secret".into(),
        jwt_expires_hours: 1,
        cookie_secure: false,
        db_max_connections: 5,
    };
    let pool = create_pool(&database_url, config.db_max_connections).await?;
    let state = AppState::new(pool, config);
    run_migrations(&state.orm).await?;

    sqlx::query(
        "TRUNCATE audit_logs, order_items, orders, customers, inventory_imports, ingredients, \
         product_variants, products, categories, users CASCADE",
    )
    .execute(&state.pool)
    .await?;

    Ok(Some(state))
}

pub async fn create_user(state: &AppState, name: &str, email: &str, role: Role) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    let role_str = match role {
        Role::Admin => "ADMIN",
        Role::Staff => "STAFF",
    };
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(hash_password("password123")?)
    .bind(role_str)
    .execute(&state.pool)
    .await?;

    Ok(AuthUser {
        user_id: id,
        email: email.to_string(),
        name: name.to_string(),
        role,
    })
}

pub fn data<T>(resp: ApiResponse<T>) -> T {
    resp.data.expect("response data")
}
