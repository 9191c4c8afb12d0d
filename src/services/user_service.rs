use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::users::{CreateUserRequest, UpdateUserRequest, UserList, UserListQuery},
    entity::{
        InventoryImports, Orders,
        inventory_imports::Column as ImportCol,
        orders::Column as OrderCol,
        users::{self, ActiveModel as UserActive, Column as UserCol, Entity as Users, Role},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::User,
    response::{ApiResponse, MessageData, Meta},
    services::{
        auth_service::{find_by_email, hash_password, normalize_email},
        ilike_any, search_pattern,
    },
    state::AppState,
};

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: UserListQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(pattern) = search_pattern(query.search.as_deref()) {
        condition = condition.add(ilike_any(&[UserCol::Name, UserCol::Email], &pattern));
    }
    if let Some(role) = query.role {
        condition = condition.add(UserCol::Role.eq(role));
    }
    if let Some(is_active) = query.is_active {
        condition = condition.add(UserCol::IsActive.eq(is_active));
    }

    let finder = Users::find()
        .filter(condition)
        .order_by_desc(UserCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

async fn find_user(state: &AppState, id: Uuid) -> AppResult<users::Model> {
    Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

pub async fn get_user(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    let found = find_user(state, id).await?;
    Ok(ApiResponse::success("User", found.into(), Some(Meta::empty())))
}

pub async fn create_user(
    state: &AppState,
    user: &AuthUser,
    payload: CreateUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    payload.validate()?;

    if find_by_email(state, &payload.email).await?.is_some() {
        return Err(AppError::validation("Email already exists"));
    }

    let now = Utc::now();
    let created = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        email: Set(normalize_email(&payload.email)),
        password_hash: Set(hash_password(&payload.password)?),
        role: Set(payload.role.unwrap_or(Role::Staff)),
        is_active: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        user.user_id,
        "user_create",
        "users",
        serde_json::json!({ "user_id": created.id, "role": created.role }),
    )
    .await;

    Ok(ApiResponse::success("User created", created.into(), Some(Meta::empty())))
}

pub async fn update_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    payload.validate()?;

    let existing = find_user(state, id).await?;

    if let Some(email) = payload.email.as_deref() {
        let email = normalize_email(email);
        if email != existing.email {
            let taken = Users::find()
                .filter(UserCol::Email.eq(email.as_str()))
                .filter(UserCol::Id.ne(id))
                .count(&state.orm)
                .await?;
            if taken > 0 {
                return Err(AppError::validation("Email already exists"));
            }
        }
    }

    let mut active: UserActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(email) = payload.email {
        active.email = Set(normalize_email(&email));
    }
    if let Some(password) = payload.password {
        active.password_hash = Set(hash_password(&password)?);
    }
    if let Some(role) = payload.role {
        active.role = Set(role);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "user_update",
        "users",
        serde_json::json!({ "user_id": updated.id }),
    )
    .await;

    Ok(ApiResponse::success("User updated", updated.into(), Some(Meta::empty())))
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<MessageData>> {
    ensure_admin(user)?;
    if id == user.user_id {
        return Err(AppError::validation("You cannot delete your own account"));
    }

    let existing = find_user(state, id).await?;

    let orders = Orders::find()
        .filter(OrderCol::CreatedById.eq(id))
        .count(&state.orm)
        .await?;
    let imports = InventoryImports::find()
        .filter(ImportCol::CreatedById.eq(id))
        .count(&state.orm)
        .await?;
    if orders > 0 || imports > 0 {
        return Err(AppError::validation(
            "Cannot delete user with existing orders or imports. Deactivate it instead.",
        ));
    }

    Users::delete_by_id(existing.id).exec(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "user_delete",
        "users",
        serde_json::json!({ "user_id": id, "email": existing.email }),
    )
    .await;

    Ok(ApiResponse::success(
        "User deleted",
        MessageData::new("User deleted successfully"),
        Some(Meta::empty()),
    ))
}
