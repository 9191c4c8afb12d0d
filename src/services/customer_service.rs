use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::{
        check_len,
        customers::{CreateCustomerRequest, CustomerList, CustomerListQuery, UpdateCustomerRequest},
    },
    entity::{
        customers::{self, ActiveModel as CustomerActive, Column as CustomerCol, Entity as Customers},
        orders::{Column as OrderCol, Entity as Orders},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Customer,
    response::{ApiResponse, MessageData, Meta},
    services::{count_by, ilike_any, search_pattern},
    state::AppState,
};

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn list_customers(
    state: &AppState,
    query: CustomerListQuery,
) -> AppResult<ApiResponse<CustomerList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(pattern) = search_pattern(query.search.as_deref()) {
        condition = condition.add(ilike_any(
            &[CustomerCol::Name, CustomerCol::Phone, CustomerCol::Address],
            &pattern,
        ));
    }

    let finder = Customers::find()
        .filter(condition)
        .order_by_desc(CustomerCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let rows = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let counts = count_by::<Orders, _>(
        &state.orm,
        OrderCol::CustomerId,
        rows.iter().map(|c| c.id).collect(),
    )
    .await?;
    let items = rows
        .into_iter()
        .map(|c| {
            let count = counts.get(&c.id).copied().unwrap_or(0);
            Customer::from_entity(c, count)
        })
        .collect();

    Ok(ApiResponse::success(
        "Customers",
        CustomerList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

async fn find_customer(state: &AppState, id: Uuid) -> AppResult<customers::Model> {
    Customers::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Customer"))
}

async fn order_count(state: &AppState, id: Uuid) -> AppResult<i64> {
    let count = Orders::find()
        .filter(OrderCol::CustomerId.eq(id))
        .count(&state.orm)
        .await?;
    Ok(count as i64)
}

async fn ensure_unique_phone(state: &AppState, phone: &str, except: Option<Uuid>) -> AppResult<()> {
    let mut finder = Customers::find().filter(CustomerCol::Phone.eq(phone));
    if let Some(id) = except {
        finder = finder.filter(CustomerCol::Id.ne(id));
    }
    if finder.count(&state.orm).await? > 0 {
        return Err(AppError::validation("Phone number already exists"));
    }
    Ok(())
}

pub async fn get_customer(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Customer>> {
    let customer = find_customer(state, id).await?;
    let count = order_count(state, id).await?;
    Ok(ApiResponse::success(
        "Customer",
        Customer::from_entity(customer, count),
        Some(Meta::empty()),
    ))
}

pub async fn create_customer(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCustomerRequest,
) -> AppResult<ApiResponse<Customer>> {
    payload.validate()?;
    let phone = payload.phone.trim().to_string();
    ensure_unique_phone(state, &phone, None).await?;

    let now = Utc::now();
    let customer = CustomerActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        phone: Set(phone),
        address: Set(optional_text(payload.address)),
        note: Set(optional_text(payload.note)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        user.user_id,
        "customer_create",
        "customers",
        serde_json::json!({ "customer_id": customer.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Customer created",
        Customer::from_entity(customer, 0),
        Some(Meta::empty()),
    ))
}

pub async fn update_customer(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCustomerRequest,
) -> AppResult<ApiResponse<Customer>> {
    payload.validate()?;
    check_len(&payload.address, 500, "Address")?;
    check_len(&payload.note, 500, "Note")?;
    let existing = find_customer(state, id).await?;

    let mut active: CustomerActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(phone) = payload.phone {
        let phone = phone.trim().to_string();
        ensure_unique_phone(state, &phone, Some(id)).await?;
        active.phone = Set(phone);
    }
    if let Some(address) = payload.address {
        active.address = Set(optional_text(address));
    }
    if let Some(note) = payload.note {
        active.note = Set(optional_text(note));
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;
    let count = order_count(state, id).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "customer_update",
        "customers",
        serde_json::json!({ "customer_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Customer updated",
        Customer::from_entity(updated, count),
        Some(Meta::empty()),
    ))
}

pub async fn delete_customer(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<MessageData>> {
    ensure_admin(user)?;
    let existing = find_customer(state, id).await?;

    if order_count(state, id).await? > 0 {
        return Err(AppError::validation(
            "Cannot delete customer with existing orders",
        ));
    }

    Customers::delete_by_id(existing.id).exec(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "customer_delete",
        "customers",
        serde_json::json!({ "customer_id": id, "phone": existing.phone }),
    )
    .await;

    Ok(ApiResponse::success(
        "Customer deleted",
        MessageData::new("Customer deleted successfully"),
        Some(Meta::empty()),
    ))
}
