use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::{
        check_len,
        orders::{
            CreateOrderRequest, OrderList, OrderListQuery, OrderSortBy, UpcomingOrders,
            UpcomingQuery, UpdateOrderRequest,
        },
    },
    entity::{
        Customers, Products, Users,
        customers::Column as CustomerCol,
        order_items::{
            self, ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
        },
        orders::{self, ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, OrderStatus},
        product_variants::{self, Column as VariantCol, Entity as ProductVariants},
        products::Column as ProductCol,
        users::Column as UserCol,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{
        CustomerSummary, Order, OrderItem, ProductSummary, UserSummary, VariantSummary, utc,
    },
    response::{ApiResponse, MessageData, Meta},
    routes::params::SortOrder,
    services::{ilike_any, search_pattern},
    state::AppState,
};

/// Price snapshot of one order line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub cost_price: Decimal,
}

impl Line {
    pub fn subtotal(&self) -> AppResult<Decimal> {
        amount(self.unit_price, self.quantity)
    }

    pub fn cost(&self) -> AppResult<Decimal> {
        amount(self.cost_price, self.quantity)
    }
}

/// Largest order amount that fits NUMERIC(16, 2).
fn total_limit() -> Decimal {
    Decimal::from(100_000_000_000_000i64)
}

fn too_large() -> AppError {
    AppError::validation("Order amount is too large")
}

fn amount(price: Decimal, quantity: Decimal) -> AppResult<Decimal> {
    price
        .checked_mul(quantity)
        .map(|value| value.round_dp(2))
        .filter(|value| value.abs() < total_limit())
        .ok_or_else(too_large)
}

fn checked_sum<I>(values: I) -> AppResult<Decimal>
where
    I: IntoIterator<Item = AppResult<Decimal>>,
{
    let mut sum = Decimal::ZERO;
    for value in values {
        sum = sum
            .checked_add(value?)
            .filter(|sum| sum.abs() < total_limit())
            .ok_or_else(too_large)?;
    }
    Ok(sum)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    pub total_amount: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
}

impl OrderTotals {
    pub fn compute(lines: &[Line], discount: Decimal) -> AppResult<Self> {
        let gross = checked_sum(lines.iter().map(Line::subtotal))?;
        let total_cost = checked_sum(lines.iter().map(Line::cost))?;
        if discount > gross {
            return Err(AppError::validation(
                "Discount cannot exceed the order subtotal",
            ));
        }
        let total_amount = gross - discount;
        Ok(Self {
            total_amount,
            total_cost,
            total_profit: total_amount - total_cost,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockMove {
    Keep,
    /// Return the items' quantities to variant stock.
    Release,
    /// Take the items' quantities out of variant stock again.
    Take,
}

pub fn stock_move(from: OrderStatus, to: OrderStatus) -> StockMove {
    match (from.holds_stock(), to.holds_stock()) {
        (true, false) => StockMove::Release,
        (false, true) => StockMove::Take,
        _ => StockMove::Keep,
    }
}

/// Quantity needed per variant, merging repeated lines.
fn quantities_by_variant<I>(items: I) -> AppResult<BTreeMap<Uuid, Decimal>>
where
    I: IntoIterator<Item = (Uuid, Decimal)>,
{
    let mut needs = BTreeMap::new();
    for (variant_id, quantity) in items {
        let need = needs.entry(variant_id).or_insert(Decimal::ZERO);
        *need = need
            .checked_add(quantity)
            .ok_or_else(|| AppError::validation("Order quantity is too large"))?;
    }
    Ok(needs)
}

async fn lock_variants(
    conn: &impl ConnectionTrait,
    ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, product_variants::Model>> {
    let variants = ProductVariants::find()
        .filter(VariantCol::Id.is_in(ids))
        .order_by_asc(VariantCol::Id)
        .lock(LockType::Update)
        .all(conn)
        .await?;
    Ok(variants.into_iter().map(|v| (v.id, v)).collect())
}

fn ensure_stock(variant: &product_variants::Model, required: Decimal) -> AppResult<()> {
    if variant.stock_quantity < required {
        return Err(AppError::validation(format!(
            "Insufficient stock for {}: {} available, {} requested",
            variant.name, variant.stock_quantity, required
        )));
    }
    Ok(())
}

async fn shift_stock(
    conn: &impl ConnectionTrait,
    needs: &BTreeMap<Uuid, Decimal>,
    direction: StockMove,
) -> AppResult<()> {
    for (variant_id, quantity) in needs {
        let expr = match direction {
            StockMove::Keep => continue,
            StockMove::Release => Expr::col(VariantCol::StockQuantity).add(*quantity),
            StockMove::Take => Expr::col(VariantCol::StockQuantity).sub(*quantity),
        };
        ProductVariants::update_many()
            .col_expr(VariantCol::StockQuantity, expr)
            .col_expr(VariantCol::UpdatedAt, Expr::value(Utc::now()))
            .filter(VariantCol::Id.eq(*variant_id))
            .exec(conn)
            .await?;
    }
    Ok(())
}

async fn order_needs(
    conn: &impl ConnectionTrait,
    order_id: Uuid,
) -> AppResult<(Vec<order_items::Model>, BTreeMap<Uuid, Decimal>)> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(conn)
        .await?;
    let needs = quantities_by_variant(items.iter().map(|i| (i.product_variant_id, i.quantity)))?;
    Ok((items, needs))
}

pub async fn list_orders(
    state: &AppState,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let (from, to) = query.range()?;

    let mut condition = Condition::all();
    if let Some(pattern) = search_pattern(query.search.as_deref()) {
        condition = condition.add(ilike_any(
            &[OrderCol::CustomerName, OrderCol::Phone, OrderCol::Address],
            &pattern,
        ));
    }
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }
    if let Some(from) = from {
        condition = condition.add(OrderCol::CreatedAt.gte(from));
    }
    if let Some(to) = to {
        condition = condition.add(OrderCol::CreatedAt.lte(to));
    }

    let sort_col = match query.sort_by.unwrap_or_default() {
        OrderSortBy::CreatedAt => OrderCol::CreatedAt,
        OrderSortBy::DeliveryTime => OrderCol::DeliveryTime,
        OrderSortBy::TotalAmount => OrderCol::TotalAmount,
        OrderSortBy::CustomerName => OrderCol::CustomerName,
    };
    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or_default() {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };
    finder = finder.order_by_desc(OrderCol::Id);

    let total = finder.clone().count(&state.orm).await? as i64;
    let rows = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = load_details(&state.orm, rows).await?;

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn upcoming_orders(
    state: &AppState,
    query: UpcomingQuery,
) -> AppResult<ApiResponse<UpcomingOrders>> {
    let hours = query.hours()?;
    let now = Utc::now();
    let until = now + Duration::hours(hours);

    let rows = Orders::find()
        .filter(OrderCol::Status.is_in([OrderStatus::Pending, OrderStatus::Confirmed]))
        .filter(OrderCol::DeliveryTime.gte(now))
        .filter(OrderCol::DeliveryTime.lte(until))
        .order_by_asc(OrderCol::DeliveryTime)
        .all(&state.orm)
        .await?;
    let items = load_details(&state.orm, rows).await?;

    Ok(ApiResponse::success(
        "Upcoming orders",
        UpcomingOrders {
            count: items.len() as i64,
            hours,
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Batch-load items (with variant and product summaries), customers and creators.
pub(crate) async fn load_details(
    conn: &impl ConnectionTrait,
    rows: Vec<orders::Model>,
) -> AppResult<Vec<Order>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let order_ids: Vec<Uuid> = rows.iter().map(|o| o.id).collect();
    let customer_ids: Vec<Uuid> = rows
        .iter()
        .filter_map(|o| o.customer_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let user_ids: Vec<Uuid> = rows
        .iter()
        .map(|o| o.created_by_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids))
        .all(conn)
        .await?;

    let variant_ids: Vec<Uuid> = items
        .iter()
        .map(|i| i.product_variant_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let variants = if variant_ids.is_empty() {
        Vec::new()
    } else {
        ProductVariants::find()
            .filter(VariantCol::Id.is_in(variant_ids))
            .all(conn)
            .await?
    };

    let product_ids: Vec<Uuid> = variants
        .iter()
        .map(|v| v.product_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let products: HashMap<Uuid, ProductSummary> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        Products::find()
            .filter(ProductCol::Id.is_in(product_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|p| (p.id, ProductSummary { id: p.id, name: p.name }))
            .collect()
    };
    let variants: HashMap<Uuid, VariantSummary> = variants
        .into_iter()
        .map(|v| {
            let summary = VariantSummary {
                id: v.id,
                name: v.name,
                unit: v.unit,
                product_id: v.product_id,
                product: products.get(&v.product_id).cloned(),
            };
            (v.id, summary)
        })
        .collect();

    let customers: HashMap<Uuid, CustomerSummary> = if customer_ids.is_empty() {
        HashMap::new()
    } else {
        Customers::find()
            .filter(CustomerCol::Id.is_in(customer_ids))
            .all(conn)
            .await?
            .iter()
            .map(|c| (c.id, CustomerSummary::from(c)))
            .collect()
    };
    let users: HashMap<Uuid, UserSummary> = Users::find()
        .filter(UserCol::Id.is_in(user_ids))
        .all(conn)
        .await?
        .iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect();

    let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItem {
                id: item.id,
                product_variant_id: item.product_variant_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                cost_price: item.cost_price,
                subtotal: item.subtotal,
                product_variant: variants.get(&item.product_variant_id).cloned(),
            });
    }

    Ok(rows
        .into_iter()
        .map(|o| Order {
            id: o.id,
            customer_name: o.customer_name,
            phone: o.phone,
            address: o.address,
            delivery_time: utc(o.delivery_time),
            status: o.status,
            total_amount: o.total_amount,
            total_cost: o.total_cost,
            total_profit: o.total_profit,
            discount: o.discount,
            note: o.note,
            customer_id: o.customer_id,
            customer: o.customer_id.and_then(|id| customers.get(&id).cloned()),
            created_by: users.get(&o.created_by_id).cloned(),
            items: items_by_order.remove(&o.id).unwrap_or_default(),
            created_at: utc(o.created_at),
            updated_at: utc(o.updated_at),
        })
        .collect())
}

async fn load_one(conn: &impl ConnectionTrait, id: Uuid) -> AppResult<Order> {
    let order = Orders::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;
    load_details(conn, vec![order])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Order"))
}

pub async fn get_order(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Order>> {
    let order = load_one(&state.orm, id).await?;
    Ok(ApiResponse::success("Order", order, Some(Meta::empty())))
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    payload.validate()?;
    let discount = payload.discount.unwrap_or(Decimal::ZERO);

    let txn = state.orm.begin().await?;

    if let Some(customer_id) = payload.customer_id {
        if Customers::find_by_id(customer_id).one(&txn).await?.is_none() {
            return Err(AppError::validation("Customer not found"));
        }
    }

    let needs = quantities_by_variant(
        payload
            .items
            .iter()
            .map(|i| (i.product_variant_id, i.quantity)),
    )?;
    let variants = lock_variants(&txn, needs.keys().copied().collect()).await?;
    for (variant_id, required) in &needs {
        let variant = variants
            .get(variant_id)
            .filter(|v| v.is_active)
            .ok_or_else(|| {
                AppError::validation(format!("Product variant {variant_id} not found or inactive"))
            })?;
        ensure_stock(variant, *required)?;
    }

    let lines: Vec<(Uuid, Line)> = payload
        .items
        .iter()
        .filter_map(|item| {
            variants.get(&item.product_variant_id).map(|v| {
                let line = Line {
                    quantity: item.quantity,
                    unit_price: v.selling_price,
                    cost_price: v.cost_price,
                };
                (v.id, line)
            })
        })
        .collect();
    let totals = OrderTotals::compute(
        &lines.iter().map(|(_, line)| *line).collect::<Vec<_>>(),
        discount,
    )?;

    let now = Utc::now();
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_name: Set(payload.customer_name.trim().to_string()),
        phone: Set(payload.phone.trim().to_string()),
        address: Set(payload.address.trim().to_string()),
        delivery_time: Set(payload.delivery_time.into()),
        status: Set(OrderStatus::Pending),
        total_amount: Set(totals.total_amount),
        total_cost: Set(totals.total_cost),
        total_profit: Set(totals.total_profit),
        discount: Set(discount),
        note: Set(payload.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())),
        customer_id: Set(payload.customer_id),
        created_by_id: Set(user.user_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    for (variant_id, line) in &lines {
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_variant_id: Set(*variant_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            cost_price: Set(line.cost_price),
            subtotal: Set(line.subtotal()?),
        }
        .insert(&txn)
        .await?;
    }
    shift_stock(&txn, &needs, StockMove::Take).await?;

    let created = load_one(&txn, order.id).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        user.user_id,
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": totals.total_amount }),
    )
    .await;

    Ok(ApiResponse::success("Order created", created, Some(Meta::empty())))
}

pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    payload.validate()?;
    check_len(&payload.note, 500, "Note")?;

    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    if !existing.status.allows_update(payload.status) {
        return Err(AppError::validation(
            "Cannot update completed or cancelled orders",
        ));
    }

    let previous_status = existing.status;
    let next_status = payload.status.unwrap_or(previous_status);
    let movement = stock_move(previous_status, next_status);

    let needs_items = payload.discount.is_some() || movement != StockMove::Keep;
    let (items, needs) = if needs_items {
        order_needs(&txn, id).await?
    } else {
        (Vec::new(), BTreeMap::new())
    };

    let mut active: OrderActive = existing.into();
    if let Some(name) = payload.customer_name {
        active.customer_name = Set(name.trim().to_string());
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(phone.trim().to_string());
    }
    if let Some(address) = payload.address {
        active.address = Set(address.trim().to_string());
    }
    if let Some(delivery_time) = payload.delivery_time {
        active.delivery_time = Set(delivery_time.into());
    }
    if let Some(note) = payload.note {
        active.note = Set(note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()));
    }
    if let Some(discount) = payload.discount {
        let lines: Vec<Line> = items
            .iter()
            .map(|i| Line {
                quantity: i.quantity,
                unit_price: i.unit_price,
                cost_price: i.cost_price,
            })
            .collect();
        let totals = OrderTotals::compute(&lines, discount)?;
        active.discount = Set(discount);
        active.total_amount = Set(totals.total_amount);
        active.total_cost = Set(totals.total_cost);
        active.total_profit = Set(totals.total_profit);
    }
    active.status = Set(next_status);
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    if movement == StockMove::Take {
        let variants = lock_variants(&txn, needs.keys().copied().collect()).await?;
        for (variant_id, required) in &needs {
            let variant = variants
                .get(variant_id)
                .ok_or_else(|| AppError::validation(format!("Product variant {variant_id} not found")))?;
            ensure_stock(variant, *required)?;
        }
    }
    shift_stock(&txn, &needs, movement).await?;

    let updated = load_one(&txn, id).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        user.user_id,
        "order_update",
        "orders",
        serde_json::json!({
            "order_id": id,
            "from_status": previous_status,
            "to_status": next_status,
        }),
    )
    .await;

    Ok(ApiResponse::success("Order updated", updated, Some(Meta::empty())))
}

pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<MessageData>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    if existing.status != OrderStatus::Pending {
        return Err(AppError::validation("Can only delete pending orders"));
    }

    let (_, needs) = order_needs(&txn, id).await?;
    shift_stock(&txn, &needs, StockMove::Release).await?;
    Orders::delete_by_id(existing.id).exec(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        user.user_id,
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id, "customer_name": existing.customer_name }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order deleted",
        MessageData::new("Order deleted successfully"),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    fn line(quantity: &str, unit_price: &str, cost_price: &str) -> Line {
        Line {
            quantity: dec(quantity),
            unit_price: dec(unit_price),
            cost_price: dec(cost_price),
        }
    }

    #[test]
    fn totals_apply_discount_and_cost() {
        let lines = [line("2", "35000", "20000"), line("1.5", "10000", "4000")];
        let totals = OrderTotals::compute(&lines, dec("5000")).unwrap();
        assert_eq!(totals.total_amount, dec("80000"));
        assert_eq!(totals.total_cost, dec("46000"));
        assert_eq!(totals.total_profit, dec("34000"));
    }

    #[test]
    fn discount_cannot_exceed_subtotal() {
        let lines = [line("1", "10000", "5000")];
        assert!(OrderTotals::compute(&lines, dec("10000")).is_ok());
        assert!(OrderTotals::compute(&lines, dec("10000.01")).is_err());
    }

    #[test]
    fn oversized_amounts_are_rejected_not_panicking() {
        let huge = line("99999999999.999", "9999999999.99", "0");
        assert!(huge.subtotal().is_err());
        assert!(OrderTotals::compute(&[huge], Decimal::ZERO).is_err());

        let max = Line {
            quantity: Decimal::MAX,
            unit_price: Decimal::MAX,
            cost_price: Decimal::MAX,
        };
        assert!(OrderTotals::compute(&[max], Decimal::ZERO).is_err());

        // Each line fits on its own, their sum does not.
        let big = line("10000000000", "6000", "0");
        assert!(big.subtotal().is_ok());
        assert!(OrderTotals::compute(&[big, big], Decimal::ZERO).is_err());
    }

    #[test]
    fn merging_quantities_checks_for_overflow() {
        let a = Uuid::new_v4();
        assert!(quantities_by_variant([(a, Decimal::MAX), (a, Decimal::MAX)]).is_err());
    }

    #[test]
    fn cancelling_releases_and_reopening_takes() {
        use OrderStatus::*;
        assert_eq!(stock_move(Pending, Cancelled), StockMove::Release);
        assert_eq!(stock_move(Confirmed, Cancelled), StockMove::Release);
        assert_eq!(stock_move(Cancelled, Done), StockMove::Take);
        assert_eq!(stock_move(Pending, Done), StockMove::Keep);
        assert_eq!(stock_move(Cancelled, Cancelled), StockMove::Keep);
    }

    #[test]
    fn repeated_variants_are_merged() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let needs =
            quantities_by_variant([(a, dec("1")), (b, dec("2")), (a, dec("0.5"))]).unwrap();
        assert_eq!(needs.len(), 2);
        assert_eq!(needs[&a], dec("1.5"));
        assert_eq!(needs[&b], dec("2"));
    }
}
