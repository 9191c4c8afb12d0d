use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::products::{
        CreateProductRequest, CreateVariantRequest, ProductList, ProductListQuery,
        UpdateProductRequest, UpdateVariantRequest, UpsertVariantRequest,
    },
    entity::{
        Categories,
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        product_variants::{
            self, ActiveModel as VariantActive, Column as VariantCol, Entity as ProductVariants,
        },
        products::{self, ActiveModel as ProductActive, Column as ProductCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{CategorySummary, Product, ProductVariant, utc},
    response::{ApiResponse, MessageData, Meta},
    services::{ilike_any, search_pattern},
    state::AppState,
};

pub const DEFAULT_UNIT: &str = "portion";

pub async fn list_products(
    state: &AppState,
    query: ProductListQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(pattern) = search_pattern(query.search.as_deref()) {
        condition = condition.add(ilike_any(
            &[ProductCol::Name, ProductCol::Description],
            &pattern,
        ));
    }
    if let Some(category_id) = query.category_id {
        condition = condition.add(ProductCol::CategoryId.eq(category_id));
    }
    if let Some(is_active) = query.is_active {
        condition = condition.add(ProductCol::IsActive.eq(is_active));
    }

    let finder = Products::find()
        .filter(condition)
        .order_by_desc(ProductCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let rows = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = load_details(&state.orm, rows).await?;

    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Attach category summaries and variants (oldest first) to a page of products.
pub(crate) async fn load_details(
    conn: &impl ConnectionTrait,
    rows: Vec<products::Model>,
) -> AppResult<Vec<Product>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let product_ids: Vec<Uuid> = rows.iter().map(|p| p.id).collect();
    let category_ids: Vec<Uuid> = rows
        .iter()
        .map(|p| p.category_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let categories: HashMap<Uuid, CategorySummary> = Categories::find()
        .filter(crate::entity::categories::Column::Id.is_in(category_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|c| (c.id, CategorySummary { id: c.id, name: c.name }))
        .collect();

    let mut variants: HashMap<Uuid, Vec<ProductVariant>> = HashMap::new();
    for variant in ProductVariants::find()
        .filter(VariantCol::ProductId.is_in(product_ids))
        .order_by_asc(VariantCol::CreatedAt)
        .all(conn)
        .await?
    {
        variants
            .entry(variant.product_id)
            .or_default()
            .push(variant.into());
    }

    Ok(rows
        .into_iter()
        .map(|p| {
            let category = categories.get(&p.category_id).cloned();
            let variants = variants.remove(&p.id).unwrap_or_default();
            product_from_entity(p, category, variants)
        })
        .collect())
}

fn product_from_entity(
    model: products::Model,
    category: Option<CategorySummary>,
    variants: Vec<ProductVariant>,
) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        is_active: model.is_active,
        category_id: model.category_id,
        category,
        variants,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    }
}

async fn load_one(conn: &impl ConnectionTrait, id: Uuid) -> AppResult<Product> {
    let product = Products::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    load_details(conn, vec![product])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Product"))
}

async fn ensure_category(conn: &impl ConnectionTrait, id: Uuid) -> AppResult<()> {
    if Categories::find_by_id(id).one(conn).await?.is_none() {
        return Err(AppError::validation("Category not found"));
    }
    Ok(())
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn variant_unit(unit: Option<String>) -> String {
    unit.map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_UNIT.to_string())
}

fn new_variant(product_id: Uuid, input: CreateVariantRequest) -> VariantActive {
    let now = Utc::now();
    VariantActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        name: Set(input.name.trim().to_string()),
        unit: Set(variant_unit(input.unit)),
        cost_price: Set(input.cost_price),
        selling_price: Set(input.selling_price),
        stock_quantity: Set(input.stock_quantity.unwrap_or(Decimal::ZERO)),
        is_active: Set(input.is_active.unwrap_or(true)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = load_one(&state.orm, id).await?;
    Ok(ApiResponse::success("Product", product, Some(Meta::empty())))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    payload.validate()?;

    let txn = state.orm.begin().await?;
    ensure_category(&txn, payload.category_id).await?;

    let now = Utc::now();
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        description: Set(clean_description(payload.description)),
        category_id: Set(payload.category_id),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    for variant in payload.variants {
        new_variant(product.id, variant).insert(&txn).await?;
    }

    let created = load_one(&txn, product.id).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        user.user_id,
        "product_create",
        "products",
        serde_json::json!({ "product_id": created.id, "variants": created.variants.len() }),
    )
    .await;

    Ok(ApiResponse::success("Product created", created, Some(Meta::empty())))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    payload.validate()?;

    let txn = state.orm.begin().await?;
    let existing = Products::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    if let Some(Some(description)) = &payload.description {
        if description.chars().count() > 1000 {
            return Err(AppError::validation(
                "Description must be at most 1000 characters",
            ));
        }
    }

    let mut active: ProductActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(clean_description(description));
    }
    if let Some(category_id) = payload.category_id {
        ensure_category(&txn, category_id).await?;
        active.category_id = Set(category_id);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    if let Some(variants) = payload.variants {
        sync_variants(&txn, id, variants).await?;
    }

    let updated = load_one(&txn, id).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        user.user_id,
        "product_update",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Product updated", updated, Some(Meta::empty())))
}

/// Make the product's variants match `inputs`: update listed ids, create entries
/// without an id, delete the rest unless order items still reference them.
async fn sync_variants(
    conn: &impl ConnectionTrait,
    product_id: Uuid,
    inputs: Vec<UpsertVariantRequest>,
) -> AppResult<()> {
    let mut existing: HashMap<Uuid, product_variants::Model> = ProductVariants::find()
        .filter(VariantCol::ProductId.eq(product_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|v| (v.id, v))
        .collect();

    let mut keep: HashSet<Uuid> = HashSet::new();
    for input in &inputs {
        if let Some(id) = input.id {
            if !existing.contains_key(&id) {
                return Err(AppError::validation(
                    "Variant does not belong to this product",
                ));
            }
            if !keep.insert(id) {
                return Err(AppError::validation(format!(
                    "Variant {id} is listed more than once"
                )));
            }
        }
    }

    let removed: Vec<Uuid> = existing
        .keys()
        .filter(|id| !keep.contains(id))
        .copied()
        .collect();
    if !removed.is_empty() {
        let referenced = OrderItems::find()
            .filter(OrderItemCol::ProductVariantId.is_in(removed.clone()))
            .count(conn)
            .await?;
        if referenced > 0 {
            return Err(AppError::validation(
                "Cannot remove variants that are used in orders. Deactivate them instead.",
            ));
        }
        ProductVariants::delete_many()
            .filter(VariantCol::Id.is_in(removed))
            .exec(conn)
            .await?;
    }

    for input in inputs {
        match input.id.and_then(|id| existing.remove(&id)) {
            Some(current) => {
                let mut active: VariantActive = current.into();
                active.name = Set(input.name.trim().to_string());
                active.unit = Set(variant_unit(input.unit));
                active.cost_price = Set(input.cost_price);
                active.selling_price = Set(input.selling_price);
                if let Some(stock) = input.stock_quantity {
                    active.stock_quantity = Set(stock);
                }
                if let Some(is_active) = input.is_active {
                    active.is_active = Set(is_active);
                }
                active.updated_at = Set(Utc::now().into());
                active.update(conn).await?;
            }
            None => {
                let create = CreateVariantRequest {
                    name: input.name,
                    unit: input.unit,
                    cost_price: input.cost_price,
                    selling_price: input.selling_price,
                    stock_quantity: input.stock_quantity,
                    is_active: input.is_active,
                };
                new_variant(product_id, create).insert(conn).await?;
            }
        }
    }

    Ok(())
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<MessageData>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    let mut active: ProductActive = existing.into();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "product_deactivate",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product deleted",
        MessageData::new("Product deactivated successfully"),
        Some(Meta::empty()),
    ))
}

pub async fn create_variant(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: CreateVariantRequest,
) -> AppResult<ApiResponse<ProductVariant>> {
    ensure_admin(user)?;
    payload.validate()?;

    if Products::find_by_id(product_id).one(&state.orm).await?.is_none() {
        return Err(AppError::not_found("Product"));
    }
    let variant = new_variant(product_id, payload).insert(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "variant_create",
        "product_variants",
        serde_json::json!({ "product_id": product_id, "variant_id": variant.id }),
    )
    .await;

    Ok(ApiResponse::success("Variant created", variant.into(), Some(Meta::empty())))
}

async fn find_variant(
    state: &AppState,
    product_id: Uuid,
    variant_id: Uuid,
) -> AppResult<product_variants::Model> {
    ProductVariants::find_by_id(variant_id)
        .one(&state.orm)
        .await?
        .filter(|v| v.product_id == product_id)
        .ok_or_else(|| AppError::not_found("Variant"))
}

pub async fn update_variant(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    variant_id: Uuid,
    payload: UpdateVariantRequest,
) -> AppResult<ApiResponse<ProductVariant>> {
    ensure_admin(user)?;
    payload.validate()?;
    let existing = find_variant(state, product_id, variant_id).await?;

    let mut active: VariantActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(unit) = payload.unit {
        active.unit = Set(variant_unit(Some(unit)));
    }
    if let Some(cost_price) = payload.cost_price {
        active.cost_price = Set(cost_price);
    }
    if let Some(selling_price) = payload.selling_price {
        active.selling_price = Set(selling_price);
    }
    if let Some(stock) = payload.stock_quantity {
        active.stock_quantity = Set(stock);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "variant_update",
        "product_variants",
        serde_json::json!({ "product_id": product_id, "variant_id": variant_id }),
    )
    .await;

    Ok(ApiResponse::success("Variant updated", updated.into(), Some(Meta::empty())))
}

pub async fn delete_variant(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    variant_id: Uuid,
) -> AppResult<ApiResponse<MessageData>> {
    ensure_admin(user)?;
    let existing = find_variant(state, product_id, variant_id).await?;

    let referenced = OrderItems::find()
        .filter(OrderItemCol::ProductVariantId.eq(variant_id))
        .count(&state.orm)
        .await?;
    if referenced > 0 {
        return Err(AppError::validation(
            "Cannot delete variant that is used in orders. Deactivate it instead.",
        ));
    }

    ProductVariants::delete_by_id(existing.id)
        .exec(&state.orm)
        .await?;

    audit::record(
        &state.orm,
        user.user_id,
        "variant_delete",
        "product_variants",
        serde_json::json!({ "product_id": product_id, "variant_id": variant_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Variant deleted",
        MessageData::new("Variant deleted successfully"),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_unit_falls_back_to_portion() {
        assert_eq!(variant_unit(None), "portion");
        assert_eq!(variant_unit(Some("  ".into())), "portion");
        assert_eq!(variant_unit(Some(" box ".into())), "box");
    }

    #[test]
    fn blank_description_is_stored_as_null() {
        assert_eq!(clean_description(Some("   ".into())), None);
        assert_eq!(clean_description(Some(" crispy ".into())).as_deref(), Some("crispy"));
    }
}
