use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::ingredients::{
        CreateIngredientRequest, IngredientList, IngredientListQuery, UpdateIngredientRequest,
    },
    entity::{
        ingredients::{
            self, ActiveModel as IngredientActive, Column as IngredientCol, Entity as Ingredients,
        },
        inventory_imports::{Column as ImportCol, Entity as InventoryImports},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Ingredient,
    response::{ApiResponse, MessageData, Meta},
    services::{count_by, ilike_any, lower_eq, search_pattern},
    state::AppState,
};

pub const DEFAULT_UNIT: &str = "kg";

pub async fn list_ingredients(
    state: &AppState,
    query: IngredientListQuery,
) -> AppResult<ApiResponse<IngredientList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(pattern) = search_pattern(query.search.as_deref()) {
        condition = condition.add(ilike_any(&[IngredientCol::Name], &pattern));
    }
    if let Some(is_active) = query.is_active {
        condition = condition.add(IngredientCol::IsActive.eq(is_active));
    }

    let finder = Ingredients::find()
        .filter(condition)
        .order_by_asc(IngredientCol::Name);
    let total = finder.clone().count(&state.orm).await? as i64;
    let rows = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let counts = count_by::<InventoryImports, _>(
        &state.orm,
        ImportCol::IngredientId,
        rows.iter().map(|i| i.id).collect(),
    )
    .await?;
    let items = rows
        .into_iter()
        .map(|i| {
            let count = counts.get(&i.id).copied().unwrap_or(0);
            Ingredient::from_entity(i, count)
        })
        .collect();

    Ok(ApiResponse::success(
        "Ingredients",
        IngredientList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Every active ingredient by name, for pickers on the import form.
pub async fn list_active_ingredients(state: &AppState) -> AppResult<ApiResponse<IngredientList>> {
    let rows = Ingredients::find()
        .filter(IngredientCol::IsActive.eq(true))
        .order_by_asc(IngredientCol::Name)
        .all(&state.orm)
        .await?;
    let counts = count_by::<InventoryImports, _>(
        &state.orm,
        ImportCol::IngredientId,
        rows.iter().map(|i| i.id).collect(),
    )
    .await?;
    let items = rows
        .into_iter()
        .map(|i| {
            let count = counts.get(&i.id).copied().unwrap_or(0);
            Ingredient::from_entity(i, count)
        })
        .collect();

    Ok(ApiResponse::success(
        "Active ingredients",
        IngredientList { items },
        Some(Meta::empty()),
    ))
}

async fn find_ingredient(state: &AppState, id: Uuid) -> AppResult<ingredients::Model> {
    Ingredients::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Ingredient"))
}

async fn import_count(state: &AppState, id: Uuid) -> AppResult<i64> {
    let count = InventoryImports::find()
        .filter(ImportCol::IngredientId.eq(id))
        .count(&state.orm)
        .await?;
    Ok(count as i64)
}

async fn ensure_unique_name(state: &AppState, name: &str, except: Option<Uuid>) -> AppResult<()> {
    let mut finder = Ingredients::find().filter(lower_eq(IngredientCol::Name, name));
    if let Some(id) = except {
        finder = finder.filter(IngredientCol::Id.ne(id));
    }
    if finder.count(&state.orm).await? > 0 {
        return Err(AppError::validation("Ingredient name already exists"));
    }
    Ok(())
}

fn unit_or_default(unit: Option<String>) -> String {
    unit.map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_UNIT.to_string())
}

pub async fn get_ingredient(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Ingredient>> {
    let ingredient = find_ingredient(state, id).await?;
    let count = import_count(state, id).await?;
    Ok(ApiResponse::success(
        "Ingredient",
        Ingredient::from_entity(ingredient, count),
        Some(Meta::empty()),
    ))
}

pub async fn create_ingredient(
    state: &AppState,
    user: &AuthUser,
    payload: CreateIngredientRequest,
) -> AppResult<ApiResponse<Ingredient>> {
    ensure_admin(user)?;
    payload.validate()?;
    let name = payload.name.trim().to_string();
    ensure_unique_name(state, &name, None).await?;

    let now = Utc::now();
    let ingredient = IngredientActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        unit: Set(unit_or_default(payload.unit)),
        stock_quantity: Set(Decimal::ZERO),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        user.user_id,
        "ingredient_create",
        "ingredients",
        serde_json::json!({ "ingredient_id": ingredient.id, "name": ingredient.name }),
    )
    .await;

    Ok(ApiResponse::success(
        "Ingredient created",
        Ingredient::from_entity(ingredient, 0),
        Some(Meta::empty()),
    ))
}

pub async fn update_ingredient(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateIngredientRequest,
) -> AppResult<ApiResponse<Ingredient>> {
    ensure_admin(user)?;
    payload.validate()?;
    let existing = find_ingredient(state, id).await?;

    let mut active: IngredientActive = existing.into();
    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        ensure_unique_name(state, &name, Some(id)).await?;
        active.name = Set(name);
    }
    if let Some(unit) = payload.unit {
        active.unit = Set(unit_or_default(Some(unit)));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;
    let count = import_count(state, id).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "ingredient_update",
        "ingredients",
        serde_json::json!({ "ingredient_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Ingredient updated",
        Ingredient::from_entity(updated, count),
        Some(Meta::empty()),
    ))
}

pub async fn delete_ingredient(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<MessageData>> {
    ensure_admin(user)?;
    let existing = find_ingredient(state, id).await?;

    if import_count(state, id).await? > 0 {
        return Err(AppError::validation(
            "Cannot delete ingredient with existing imports. Deactivate it instead.",
        ));
    }

    Ingredients::delete_by_id(existing.id).exec(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "ingredient_delete",
        "ingredients",
        serde_json::json!({ "ingredient_id": id, "name": existing.name }),
    )
    .await;

    Ok(ApiResponse::success(
        "Ingredient deleted",
        MessageData::new("Ingredient deleted successfully"),
        Some(Meta::empty()),
    ))
}
