use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::{
        inventory::{CreateImportRequest, ImportList, ImportListQuery, ImportStats, UpdateImportRequest},
        quantity_limit,
    },
    entity::{
        Users,
        ingredients::{self, Column as IngredientCol, Entity as Ingredients},
        inventory_imports::{
            self, ActiveModel as ImportActive, Column as ImportCol, Entity as InventoryImports,
        },
        users::Column as UserCol,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{IngredientSummary, InventoryImport, UserSummary, utc},
    response::{ApiResponse, MessageData, Meta},
    routes::params::DateRangeQuery,
    state::AppState,
};

/// Ingredient stock after applying `delta`, refusing to go below zero.
pub(crate) fn adjusted_stock(current: Decimal, delta: Decimal) -> AppResult<Decimal> {
    let next = current
        .checked_add(delta)
        .filter(|next| *next < quantity_limit())
        .ok_or_else(|| AppError::validation("Ingredient stock would exceed the allowed maximum"))?;
    if next < Decimal::ZERO {
        return Err(AppError::validation(format!(
            "Insufficient ingredient stock: {current} on hand, change of {delta} would go negative"
        )));
    }
    Ok(next)
}

pub(crate) fn total_price(quantity: Decimal, import_price: Decimal) -> AppResult<Decimal> {
    quantity
        .checked_mul(import_price)
        .map(|total| total.round_dp(2))
        .filter(|total| *total < Decimal::from(100_000_000_000_000i64))
        .ok_or_else(|| AppError::validation("Import total is too large"))
}

fn range_condition(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Condition {
    let mut condition = Condition::all();
    if let Some(from) = from {
        condition = condition.add(ImportCol::ImportDate.gte(from));
    }
    if let Some(to) = to {
        condition = condition.add(ImportCol::ImportDate.lte(to));
    }
    condition
}

pub async fn list_imports(
    state: &AppState,
    query: ImportListQuery,
) -> AppResult<ApiResponse<ImportList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let (from, to) = query.range()?;

    let mut condition = range_condition(from, to);
    if let Some(ingredient_id) = query.ingredient_id {
        condition = condition.add(ImportCol::IngredientId.eq(ingredient_id));
    }

    let finder = InventoryImports::find()
        .filter(condition)
        .order_by_desc(ImportCol::ImportDate)
        .order_by_desc(ImportCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let rows = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = load_details(&state.orm, rows).await?;

    Ok(ApiResponse::success(
        "Inventory imports",
        ImportList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub(crate) async fn load_details(
    conn: &impl ConnectionTrait,
    rows: Vec<inventory_imports::Model>,
) -> AppResult<Vec<InventoryImport>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ingredient_ids: Vec<Uuid> = rows
        .iter()
        .map(|r| r.ingredient_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let user_ids: Vec<Uuid> = rows
        .iter()
        .map(|r| r.created_by_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let ingredients: HashMap<Uuid, IngredientSummary> = Ingredients::find()
        .filter(IngredientCol::Id.is_in(ingredient_ids))
        .all(conn)
        .await?
        .iter()
        .map(|i| (i.id, IngredientSummary::from(i)))
        .collect();
    let users: HashMap<Uuid, UserSummary> = Users::find()
        .filter(UserCol::Id.is_in(user_ids))
        .all(conn)
        .await?
        .iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect();

    Ok(rows
        .into_iter()
        .map(|r| InventoryImport {
            id: r.id,
            quantity: r.quantity,
            import_price: r.import_price,
            total_price: r.total_price,
            import_date: utc(r.import_date),
            note: r.note,
            ingredient: ingredients.get(&r.ingredient_id).cloned(),
            created_by: users.get(&r.created_by_id).cloned(),
            created_at: utc(r.created_at),
            updated_at: utc(r.updated_at),
        })
        .collect())
}

async fn load_one(conn: &impl ConnectionTrait, id: Uuid) -> AppResult<InventoryImport> {
    let row = InventoryImports::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Inventory import"))?;
    load_details(conn, vec![row])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Inventory import"))
}

pub async fn get_import(state: &AppState, id: Uuid) -> AppResult<ApiResponse<InventoryImport>> {
    let import = load_one(&state.orm, id).await?;
    Ok(ApiResponse::success("Inventory import", import, Some(Meta::empty())))
}

async fn lock_ingredient(
    conn: &impl ConnectionTrait,
    id: Uuid,
) -> AppResult<Option<ingredients::Model>> {
    let ingredient = Ingredients::find_by_id(id)
        .lock(LockType::Update)
        .one(conn)
        .await?;
    Ok(ingredient)
}

async fn set_stock(conn: &impl ConnectionTrait, id: Uuid, stock: Decimal) -> AppResult<()> {
    Ingredients::update_many()
        .col_expr(IngredientCol::StockQuantity, Expr::value(stock))
        .col_expr(IngredientCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(IngredientCol::Id.eq(id))
        .exec(conn)
        .await?;
    Ok(())
}

pub async fn create_import(
    state: &AppState,
    user: &AuthUser,
    payload: CreateImportRequest,
) -> AppResult<ApiResponse<InventoryImport>> {
    ensure_admin(user)?;
    payload.validate()?;

    let txn = state.orm.begin().await?;
    let ingredient = lock_ingredient(&txn, payload.ingredient_id)
        .await?
        .ok_or_else(|| AppError::validation("Ingredient not found"))?;
    if !ingredient.is_active {
        return Err(AppError::validation("Ingredient is inactive"));
    }

    let now = Utc::now();
    let import = ImportActive {
        id: Set(Uuid::new_v4()),
        ingredient_id: Set(ingredient.id),
        quantity: Set(payload.quantity),
        import_price: Set(payload.import_price),
        total_price: Set(total_price(payload.quantity, payload.import_price)?),
        import_date: Set(payload.import_date.unwrap_or(now).into()),
        note: Set(payload.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())),
        created_by_id: Set(user.user_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let stock = adjusted_stock(ingredient.stock_quantity, payload.quantity)?;
    set_stock(&txn, ingredient.id, stock).await?;

    let created = load_one(&txn, import.id).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        user.user_id,
        "inventory_import_create",
        "inventory_imports",
        serde_json::json!({
            "import_id": import.id,
            "ingredient_id": ingredient.id,
            "quantity": payload.quantity,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Inventory import created",
        created,
        Some(Meta::empty()),
    ))
}

pub async fn update_import(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateImportRequest,
) -> AppResult<ApiResponse<InventoryImport>> {
    ensure_admin(user)?;
    payload.validate()?;
    crate::dto::check_len(&payload.note, 500, "Note")?;

    let txn = state.orm.begin().await?;
    let existing = InventoryImports::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Inventory import"))?;
    let ingredient = lock_ingredient(&txn, existing.ingredient_id)
        .await?
        .ok_or_else(|| AppError::not_found("Ingredient"))?;

    let quantity = payload.quantity.unwrap_or(existing.quantity);
    let import_price = payload.import_price.unwrap_or(existing.import_price);
    let delta = quantity
        .checked_sub(existing.quantity)
        .ok_or_else(|| AppError::validation("Import quantity is too large"))?;

    let mut active: ImportActive = existing.into();
    if payload.quantity.is_some() || payload.import_price.is_some() {
        active.quantity = Set(quantity);
        active.import_price = Set(import_price);
        active.total_price = Set(total_price(quantity, import_price)?);
    }
    if let Some(import_date) = payload.import_date {
        active.import_date = Set(import_date.into());
    }
    if let Some(note) = payload.note {
        active.note = Set(note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()));
    }
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    if !delta.is_zero() {
        let stock = adjusted_stock(ingredient.stock_quantity, delta)?;
        set_stock(&txn, ingredient.id, stock).await?;
    }

    let updated = load_one(&txn, id).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        user.user_id,
        "inventory_import_update",
        "inventory_imports",
        serde_json::json!({ "import_id": id, "quantity_delta": delta }),
    )
    .await;

    Ok(ApiResponse::success(
        "Inventory import updated",
        updated,
        Some(Meta::empty()),
    ))
}

pub async fn delete_import(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<MessageData>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let existing = InventoryImports::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Inventory import"))?;
    let ingredient = lock_ingredient(&txn, existing.ingredient_id)
        .await?
        .ok_or_else(|| AppError::not_found("Ingredient"))?;

    let stock = adjusted_stock(ingredient.stock_quantity, -existing.quantity)?;
    InventoryImports::delete_by_id(existing.id).exec(&txn).await?;
    set_stock(&txn, ingredient.id, stock).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        user.user_id,
        "inventory_import_delete",
        "inventory_imports",
        serde_json::json!({
            "import_id": id,
            "ingredient_id": ingredient.id,
            "quantity": existing.quantity,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Inventory import deleted",
        MessageData::new("Inventory import deleted successfully"),
        Some(Meta::empty()),
    ))
}

#[derive(Debug, FromQueryResult)]
struct StatsRow {
    total_imports: i64,
    total_cost: Option<Decimal>,
}

pub async fn import_stats(
    state: &AppState,
    query: DateRangeQuery,
) -> AppResult<ApiResponse<ImportStats>> {
    let (from, to) = query.optional()?;

    let row = InventoryImports::find()
        .select_only()
        .column_as(Expr::col(ImportCol::Id).count(), "total_imports")
        .column_as(Expr::col(ImportCol::TotalPrice).sum(), "total_cost")
        .filter(range_condition(from, to))
        .into_model::<StatsRow>()
        .one(&state.orm)
        .await?;

    let stats = match row {
        Some(row) => ImportStats {
            total_imports: row.total_imports,
            total_cost: row.total_cost.unwrap_or(Decimal::ZERO),
        },
        None => ImportStats {
            total_imports: 0,
            total_cost: Decimal::ZERO,
        },
    };

    Ok(ApiResponse::success(
        "Inventory import stats",
        stats,
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn stock_adjustments_stop_at_zero() {
        let on_hand = Decimal::new(50, 1); // 5.0
        assert_eq!(adjusted_stock(on_hand, Decimal::new(-50, 1)).unwrap(), Decimal::ZERO);
        assert!(adjusted_stock(on_hand, Decimal::new(-51, 1)).is_err());
        assert_eq!(adjusted_stock(Decimal::ZERO, Decimal::new(25, 1)).unwrap(), Decimal::new(25, 1));
    }

    #[test]
    fn total_price_is_rounded_to_cents() {
        // 1.5 kg at 33.333
        assert_eq!(
            total_price(Decimal::new(15, 1), Decimal::new(33333, 3)).unwrap(),
            Decimal::new(5000, 2)
        );
    }

    #[test]
    fn oversized_imports_are_rejected_not_panicking() {
        assert!(total_price(Decimal::MAX, Decimal::MAX).is_err());
        let qty: Decimal = "99999999999.999".parse().unwrap();
        let price: Decimal = "999999999999.99".parse().unwrap();
        assert!(total_price(qty, price).is_err());
        assert!(adjusted_stock(Decimal::MAX, Decimal::MAX).is_err());
        assert!(adjusted_stock("99999999999".parse().unwrap(), Decimal::ONE).is_err());
    }
}
