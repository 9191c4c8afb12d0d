mod common;

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use shop_backoffice::{
    dto::{
        auth::{ChangePasswordRequest, LoginRequest, RegisterRequest},
        ingredients::CreateIngredientRequest,
        inventory::CreateImportRequest,
        users::{CreateUserRequest, UpdateUserRequest},
    },
    entity::{AuditLogs, audit_logs, users::Role},
    error::AppError,
    middleware::auth::AuthUser,
    services::{auth_service, ingredient_service, inventory_service, user_service},
};

use common::{create_user, data, setup_state};

fn login(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.into(),
        password: password.into(),
    }
}

// Registration, login and account administration, with their audit trail.
#[tokio::test]
async fn accounts_register_login_and_are_administered() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = create_user(&state, "Owner", "owner@example.com", Role::Admin).await?;

    let registered = data(
        auth_service::register_user(
            &state,
            RegisterRequest {
                name: "Dewi".into(),
                email: "Dewi@Example.com".into(),
                password: "secret123".into(),
                confirm_password: "secret123".into(),
            },
        )
        .await?,
    );
    assert_eq!(registered.user.email, "dewi@example.com");
    assert!(!registered.token.is_empty());
    let dewi = registered.user;

    let again = auth_service::register_user(
        &state,
        RegisterRequest {
            name: "Dewi Two".into(),
            email: "dewi@example.com".into(),
            password: "secret123".into(),
            confirm_password: "secret123".into(),
        },
    )
    .await;
    assert!(matches!(again, Err(AppError::Validation(_))));

    let blank_name = auth_service::register_user(
        &state,
        RegisterRequest {
            name: "  ".into(),
            email: "blank@example.com".into(),
            password: "secret123".into(),
            confirm_password: "secret123".into(),
        },
    )
    .await;
    assert!(matches!(blank_name, Err(AppError::Validation(_))));

    let by_admin = user_service::create_user(
        &state,
        &admin,
        CreateUserRequest {
            name: "Dewi Copy".into(),
            email: "DEWI@example.com".into(),
            password: "secret123".into(),
            role: None,
        },
    )
    .await;
    assert!(matches!(by_admin, Err(AppError::Validation(_))));

    let wrong = auth_service::login_user(&state, login("dewi@example.com", "nope-nope")).await;
    assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
    auth_service::login_user(&state, login("dewi@example.com", "secret123")).await?;

    let dewi_auth = AuthUser {
        user_id: dewi.id,
        email: dewi.email.clone(),
        name: "Dewi".into(),
        role: Role::Staff,
    };
    let bad_current = auth_service::change_password(
        &state,
        &dewi_auth,
        ChangePasswordRequest {
            current_password: "not-it".into(),
            new_password: "fresh456".into(),
        },
    )
    .await;
    assert!(matches!(bad_current, Err(AppError::InvalidCredentials)));
    auth_service::change_password(
        &state,
        &dewi_auth,
        ChangePasswordRequest {
            current_password: "secret123".into(),
            new_password: "fresh456".into(),
        },
    )
    .await?;
    let stale = auth_service::login_user(&state, login("dewi@example.com", "secret123")).await;
    assert!(matches!(stale, Err(AppError::InvalidCredentials)));
    auth_service::login_user(&state, login("dewi@example.com", "fresh456")).await?;

    let deactivated = data(
        user_service::update_user(
            &state,
            &admin,
            dewi.id,
            UpdateUserRequest {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?,
    );
    assert!(!deactivated.is_active);
    let inactive = auth_service::login_user(&state, login("dewi@example.com", "fresh456")).await;
    assert!(matches!(inactive, Err(AppError::Forbidden(_))));

    let actions: Vec<String> = AuditLogs::find()
        .filter(audit_logs::Column::UserId.eq(dewi.id))
        .order_by_asc(audit_logs::Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|entry| entry.action)
        .collect();
    assert_eq!(
        actions,
        ["user_register", "user_login", "password_change", "user_login"]
    );

    let myself = user_service::delete_user(&state, &admin, admin.user_id).await;
    assert!(matches!(myself, Err(AppError::Validation(_))));

    let manager = create_user(&state, "Manager", "manager@example.com", Role::Admin).await?;
    let sugar = data(
        ingredient_service::create_ingredient(
            &state,
            &manager,
            CreateIngredientRequest {
                name: "Sugar".into(),
                unit: None,
                is_active: None,
            },
        )
        .await?,
    );
    inventory_service::create_import(
        &state,
        &manager,
        CreateImportRequest {
            ingredient_id: sugar.id,
            quantity: Decimal::new(2, 0),
            import_price: Decimal::new(15, 0),
            import_date: None,
            note: None,
        },
    )
    .await?;
    let has_imports = user_service::delete_user(&state, &admin, manager.user_id).await;
    assert!(matches!(has_imports, Err(AppError::Validation(_))));

    user_service::delete_user(&state, &admin, dewi.id).await?;
    let gone = user_service::get_user(&state, &admin, dewi.id).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));
    let orphaned = AuditLogs::find()
        .filter(audit_logs::Column::UserId.eq(dewi.id))
        .all(&state.orm)
        .await?;
    assert!(orphaned.is_empty());

    Ok(())
}
