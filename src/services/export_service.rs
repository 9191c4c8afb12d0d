use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::{
    entity::{
        InventoryImports, Orders, Products,
        inventory_imports::Column as ImportCol,
        orders::{Column as OrderCol, OrderStatus},
        products::Column as ProductCol,
    },
    error::{AppError, AppResult},
    excel::{Cell, Sheet, build_workbook},
    middleware::auth::{AuthUser, ensure_admin},
    routes::params::DateRangeQuery,
    services::{inventory_service, order_service, product_service, report_service},
    state::AppState,
};

const DATE_TIME: &str = "%Y-%m-%d %H:%M";
const DATE: &str = "%Y-%m-%d";

#[derive(Debug)]
pub struct ExportFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub fn filename(kind: &str, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> String {
    match (from, to) {
        (Some(from), Some(to)) => format!(
            "{kind}_{}_{}.xlsx",
            from.format(DATE),
            to.format(DATE)
        ),
        _ => format!("{kind}_{}.xlsx", Utc::now().format(DATE)),
    }
}

/// Eight-character reference printed on order sheets.
pub fn short_code(id: Uuid) -> String {
    let simple = id.simple().to_string().to_uppercase();
    format!("ORD-{}", &simple[..8])
}

fn active_label(is_active: bool) -> &'static str {
    if is_active { "Active" } else { "Hidden" }
}

pub async fn export_orders(
    state: &AppState,
    user: &AuthUser,
    query: DateRangeQuery,
) -> AppResult<ExportFile> {
    ensure_admin(user)?;
    let (from, to) = query.required()?;

    let rows = Orders::find()
        .filter(OrderCol::CreatedAt.gte(from))
        .filter(OrderCol::CreatedAt.lte(to))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;
    let orders = order_service::load_details(&state.orm, rows).await?;

    let mut summary = Sheet::new(
        "Orders",
        &[
            ("Code", 14.0),
            ("Customer", 20.0),
            ("Phone", 14.0),
            ("Address", 30.0),
            ("Total", 12.0),
            ("Discount", 10.0),
            ("Profit", 12.0),
            ("Status", 12.0),
            ("Delivery time", 18.0),
            ("Note", 25.0),
            ("Created at", 18.0),
            ("Created by", 15.0),
        ],
    );
    let mut items = Sheet::new(
        "Order Items",
        &[
            ("Code", 14.0),
            ("Product", 25.0),
            ("Variant", 15.0),
            ("Unit", 10.0),
            ("Quantity", 10.0),
            ("Unit price", 12.0),
            ("Subtotal", 15.0),
        ],
    );

    for order in &orders {
        let code = short_code(order.id);
        let (customer, phone) = match &order.customer {
            Some(c) => (c.name.clone(), c.phone.clone()),
            None => (order.customer_name.clone(), order.phone.clone()),
        };
        summary.push(vec![
            code.clone().into(),
            customer.into(),
            phone.into(),
            order.address.clone().into(),
            order.total_amount.into(),
            order.discount.into(),
            order.total_profit.into(),
            order.status.label().into(),
            order.delivery_time.format(DATE_TIME).to_string().into(),
            order.note.clone().into(),
            order.created_at.format(DATE_TIME).to_string().into(),
            order.created_by.as_ref().map(|u| u.name.clone()).into(),
        ]);

        for item in &order.items {
            let variant = item.product_variant.as_ref();
            items.push(vec![
                code.clone().into(),
                variant
                    .and_then(|v| v.product.as_ref())
                    .map(|p| p.name.clone())
                    .into(),
                variant.map(|v| v.name.clone()).into(),
                variant.map(|v| v.unit.clone()).into(),
                item.quantity.into(),
                item.unit_price.into(),
                item.subtotal.into(),
            ]);
        }
    }

    let mut sheets = vec![summary];
    if !items.is_empty() {
        sheets.push(items);
    }

    Ok(ExportFile {
        filename: filename("orders", Some(from), Some(to)),
        bytes: build_workbook(&sheets)?,
    })
}

#[derive(Debug, sqlx::FromRow)]
struct DailyTotalsRow {
    day: NaiveDate,
    revenue: Decimal,
    cost: Decimal,
    profit: Decimal,
    orders: i64,
}

pub async fn export_revenue(
    state: &AppState,
    user: &AuthUser,
    query: DateRangeQuery,
) -> AppResult<ExportFile> {
    ensure_admin(user)?;
    let (from, to) = query.required()?;
    report_service::ensure_series_span(from.date_naive(), to.date_naive())?;

    let totals = report_service::revenue_summary(&state.pool, from, to).await?;
    let statuses: Vec<String> = OrderStatus::REVENUE
        .iter()
        .map(|s| s.as_str().to_string())
        .collect();
    let days: Vec<DailyTotalsRow> = sqlx::query_as(
        r#"
        SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
               COALESCE(SUM(total_amount), 0) AS revenue,
               COALESCE(SUM(total_cost), 0) AS cost,
               COALESCE(SUM(total_profit), 0) AS profit,
               COUNT(*) AS orders
        FROM orders
        WHERE status = ANY($1) AND created_at BETWEEN $2 AND $3
        GROUP BY day
        ORDER BY day
        "#,
    )
    .bind(statuses)
    .bind(from)
    .bind(to)
    .fetch_all(&state.pool)
    .await?;

    let total_cost: Decimal = days.iter().map(|d| d.cost).sum();
    let total_profit: Decimal = days.iter().map(|d| d.profit).sum();

    let mut summary = Sheet::new("Summary", &[("Revenue & profit report", 24.0), ("", 25.0)]);
    summary.push(vec!["From".into(), from.format(DATE).to_string().into()]);
    summary.push(vec!["To".into(), to.format(DATE).to_string().into()]);
    summary.push(vec![Cell::Empty]);
    summary.push(vec!["Total revenue".into(), totals.total_revenue.into()]);
    summary.push(vec!["Total cost".into(), total_cost.into()]);
    summary.push(vec!["Total profit".into(), total_profit.into()]);
    summary.push(vec!["Orders".into(), totals.total_orders.into()]);
    summary.push(vec![
        "Average order value".into(),
        totals.average_order_value.into(),
    ]);

    let mut daily = Sheet::new(
        "Daily",
        &[
            ("Date", 12.0),
            ("Revenue", 15.0),
            ("Cost", 15.0),
            ("Profit", 15.0),
            ("Orders", 10.0),
        ],
    );
    for day in days {
        daily.push(vec![
            day.day.format(DATE).to_string().into(),
            day.revenue.into(),
            day.cost.into(),
            day.profit.into(),
            day.orders.into(),
        ]);
    }

    let mut sheets = vec![summary];
    if !daily.is_empty() {
        sheets.push(daily);
    }

    Ok(ExportFile {
        filename: filename("revenue", Some(from), Some(to)),
        bytes: build_workbook(&sheets)?,
    })
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerExportRow {
    name: String,
    phone: String,
    address: Option<String>,
    note: Option<String>,
    order_count: i64,
    total_spent: Decimal,
    created_at: DateTime<Utc>,
}

pub async fn export_customers(
    state: &AppState,
    user: &AuthUser,
    query: DateRangeQuery,
) -> AppResult<ExportFile> {
    ensure_admin(user)?;
    let (from, to) = match query.optional()? {
        (Some(from), Some(to)) => (Some(from), Some(to)),
        (None, None) => (None, None),
        _ => {
            return Err(AppError::validation(
                "Provide both 'from' and 'to' or neither",
            ));
        }
    };

    let rows: Vec<CustomerExportRow> = sqlx::query_as(
        r#"
        SELECT c.name, c.phone, c.address, c.note, c.created_at,
               COUNT(o.id) AS order_count,
               COALESCE(SUM(o.total_amount), 0) AS total_spent
        FROM customers c
        LEFT JOIN orders o ON o.customer_id = c.id
        WHERE ($1::timestamptz IS NULL OR c.created_at >= $1)
          AND ($2::timestamptz IS NULL OR c.created_at <= $2)
        GROUP BY c.id
        ORDER BY c.created_at DESC
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(&state.pool)
    .await?;

    let mut sheet = Sheet::new(
        "Customers",
        &[
            ("Name", 20.0),
            ("Phone", 15.0),
            ("Address", 30.0),
            ("Note", 25.0),
            ("Orders", 10.0),
            ("Total spent", 15.0),
            ("Created at", 15.0),
        ],
    );
    for row in rows {
        sheet.push(vec![
            row.name.into(),
            row.phone.into(),
            row.address.into(),
            row.note.into(),
            row.order_count.into(),
            row.total_spent.into(),
            row.created_at.format(DATE).to_string().into(),
        ]);
    }

    Ok(ExportFile {
        filename: filename("customers", from, to),
        bytes: build_workbook(&[sheet])?,
    })
}

pub async fn export_products(state: &AppState, user: &AuthUser) -> AppResult<ExportFile> {
    ensure_admin(user)?;

    let rows = Products::find()
        .order_by_asc(ProductCol::Name)
        .all(&state.orm)
        .await?;
    let products = product_service::load_details(&state.orm, rows).await?;

    let mut product_sheet = Sheet::new(
        "Products",
        &[
            ("Name", 25.0),
            ("Category", 15.0),
            ("Description", 40.0),
            ("Variants", 12.0),
            ("Status", 12.0),
        ],
    );
    let mut variant_sheet = Sheet::new(
        "Variants",
        &[
            ("Product", 25.0),
            ("Variant", 15.0),
            ("Unit", 10.0),
            ("Cost price", 12.0),
            ("Selling price", 12.0),
            ("Stock", 10.0),
            ("Status", 12.0),
        ],
    );

    for product in &products {
        product_sheet.push(vec![
            product.name.clone().into(),
            product.category.as_ref().map(|c| c.name.clone()).into(),
            product.description.clone().into(),
            product.variants.len().into(),
            active_label(product.is_active).into(),
        ]);
        for variant in &product.variants {
            variant_sheet.push(vec![
                product.name.clone().into(),
                variant.name.clone().into(),
                variant.unit.clone().into(),
                variant.cost_price.into(),
                variant.selling_price.into(),
                variant.stock_quantity.into(),
                active_label(variant.is_active).into(),
            ]);
        }
    }

    let mut sheets = vec![product_sheet];
    if !variant_sheet.is_empty() {
        sheets.push(variant_sheet);
    }

    Ok(ExportFile {
        filename: filename("products", None, None),
        bytes: build_workbook(&sheets)?,
    })
}

pub async fn export_inventory_imports(
    state: &AppState,
    user: &AuthUser,
    query: DateRangeQuery,
) -> AppResult<ExportFile> {
    ensure_admin(user)?;
    let (from, to) = query.required()?;

    let rows = InventoryImports::find()
        .filter(ImportCol::ImportDate.gte(from))
        .filter(ImportCol::ImportDate.lte(to))
        .order_by_desc(ImportCol::ImportDate)
        .all(&state.orm)
        .await?;
    let imports = inventory_service::load_details(&state.orm, rows).await?;

    let mut sheet = Sheet::new(
        "Imports",
        &[
            ("Ingredient", 20.0),
            ("Unit", 10.0),
            ("Quantity", 10.0),
            ("Import price", 12.0),
            ("Total", 15.0),
            ("Import date", 15.0),
            ("Imported by", 15.0),
            ("Note", 25.0),
        ],
    );
    let mut total_cost = Decimal::ZERO;
    for import in &imports {
        total_cost += import.total_price;
        let ingredient = import.ingredient.as_ref();
        sheet.push(vec![
            ingredient.map(|i| i.name.clone()).into(),
            ingredient.map(|i| i.unit.clone()).into(),
            import.quantity.into(),
            import.import_price.into(),
            import.total_price.into(),
            import.import_date.format(DATE).to_string().into(),
            import.created_by.as_ref().map(|u| u.name.clone()).into(),
            import.note.clone().into(),
        ]);
    }

    let mut summary = Sheet::new("Summary", &[("Inventory import summary", 24.0), ("", 20.0)]);
    summary.push(vec!["From".into(), from.format(DATE).to_string().into()]);
    summary.push(vec!["To".into(), to.format(DATE).to_string().into()]);
    summary.push(vec![Cell::Empty]);
    summary.push(vec!["Imports".into(), imports.len().into()]);
    summary.push(vec!["Total cost".into(), total_cost.into()]);

    Ok(ExportFile {
        filename: filename("inventory-imports", Some(from), Some(to)),
        bytes: build_workbook(&[sheet, summary])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_carry_the_range() {
        let from = DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let to = DateTime::parse_from_rfc3339("2024-03-31T23:59:59Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            filename("orders", Some(from), Some(to)),
            "orders_2024-03-01_2024-03-31.xlsx"
        );
        assert!(filename("products", None, None).starts_with("products_"));
    }

    #[test]
    fn short_code_uses_the_id_prefix() {
        let id = Uuid::parse_str("1f2e3d4c-0000-4000-8000-000000000000").unwrap();
        assert_eq!(short_code(id), "ORD-1F2E3D4C");
    }
}
