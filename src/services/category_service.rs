use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::categories::{
        CategoryList, CategoryListQuery, CreateCategoryRequest, UpdateCategoryRequest,
    },
    entity::{
        categories::{self, ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories},
        products::{Column as ProductCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Category,
    response::{ApiResponse, MessageData, Meta},
    services::{count_by, ilike_any, lower_eq, search_pattern},
    state::AppState,
};

pub async fn list_categories(
    state: &AppState,
    query: CategoryListQuery,
) -> AppResult<ApiResponse<CategoryList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(pattern) = search_pattern(query.search.as_deref()) {
        condition = condition.add(ilike_any(&[CategoryCol::Name], &pattern));
    }
    if let Some(is_active) = query.is_active {
        condition = condition.add(CategoryCol::IsActive.eq(is_active));
    }

    let finder = Categories::find()
        .filter(condition)
        .order_by_asc(CategoryCol::Name);
    let total = finder.clone().count(&state.orm).await? as i64;
    let rows = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let counts = count_by::<Products, _>(
        &state.orm,
        ProductCol::CategoryId,
        rows.iter().map(|c| c.id).collect(),
    )
    .await?;
    let items = rows
        .into_iter()
        .map(|c| {
            let count = counts.get(&c.id).copied().unwrap_or(0);
            Category::from_entity(c, count)
        })
        .collect();

    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

async fn find_category(state: &AppState, id: Uuid) -> AppResult<categories::Model> {
    Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))
}

async fn product_count(state: &AppState, id: Uuid) -> AppResult<i64> {
    let count = Products::find()
        .filter(ProductCol::CategoryId.eq(id))
        .count(&state.orm)
        .await?;
    Ok(count as i64)
}

async fn ensure_unique_name(state: &AppState, name: &str, except: Option<Uuid>) -> AppResult<()> {
    let mut finder = Categories::find().filter(lower_eq(CategoryCol::Name, name));
    if let Some(id) = except {
        finder = finder.filter(CategoryCol::Id.ne(id));
    }
    if finder.count(&state.orm).await? > 0 {
        return Err(AppError::validation("Category name already exists"));
    }
    Ok(())
}

pub async fn get_category(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Category>> {
    let category = find_category(state, id).await?;
    let count = product_count(state, id).await?;
    Ok(ApiResponse::success(
        "Category",
        Category::from_entity(category, count),
        Some(Meta::empty()),
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    payload.validate()?;
    let name = payload.name.trim().to_string();
    ensure_unique_name(state, &name, None).await?;

    let now = Utc::now();
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        user.user_id,
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id, "name": category.name }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category created",
        Category::from_entity(category, 0),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    payload.validate()?;
    let existing = find_category(state, id).await?;

    let mut active: CategoryActive = existing.into();
    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        ensure_unique_name(state, &name, Some(id)).await?;
        active.name = Set(name);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;
    let count = product_count(state, id).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "category_update",
        "categories",
        serde_json::json!({ "category_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category updated",
        Category::from_entity(updated, count),
        Some(Meta::empty()),
    ))
}

pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<MessageData>> {
    ensure_admin(user)?;
    let existing = find_category(state, id).await?;

    if product_count(state, id).await? > 0 {
        return Err(AppError::validation(
            "Cannot delete category with existing products. Deactivate it instead.",
        ));
    }

    Categories::delete_by_id(existing.id).exec(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "category_delete",
        "categories",
        serde_json::json!({ "category_id": id, "name": existing.name }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category deleted",
        MessageData::new("Category deleted successfully"),
        Some(Meta::empty()),
    ))
}
