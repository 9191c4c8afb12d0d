mod common;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use shop_backoffice::{
    dto::{
        categories::CreateCategoryRequest,
        orders::{CreateOrderRequest, OrderItemRequest, OrderListQuery, UpcomingQuery, UpdateOrderRequest},
        products::{CreateProductRequest, CreateVariantRequest},
        reports::TopProductsQuery,
    },
    entity::{orders::OrderStatus, users::Role},
    error::AppError,
    routes::params::DateRangeQuery,
    services::{category_service, export_service, order_service, product_service, report_service},
    state::AppState,
};
use uuid::Uuid;

use common::{create_user, data, setup_state};

fn dec(raw: &str) -> Decimal {
    raw.parse().expect("decimal")
}

fn order_for(variant_id: Uuid, quantity: &str, discount: Option<&str>) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_name: "Bob".into(),
        phone: "0911111111".into(),
        address: "2 Side St".into(),
        delivery_time: Utc::now() + Duration::minutes(90),
        note: None,
        discount: discount.map(dec),
        customer_id: None,
        items: vec![OrderItemRequest {
            product_variant_id: variant_id,
            quantity: dec(quantity),
        }],
    }
}

async fn variant_stock(state: &AppState, product_id: Uuid) -> anyhow::Result<Decimal> {
    let product = data(product_service::get_product(state, product_id).await?);
    Ok(product.variants[0].stock_quantity)
}

fn today() -> DateRangeQuery {
    let day = Utc::now().date_naive().to_string();
    DateRangeQuery {
        from: Some(day.clone()),
        to: Some(day),
    }
}

// Order lifecycle drives variant stock, and finished orders feed the reports.
#[tokio::test]
async fn order_lifecycle_moves_stock_and_feeds_reports() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = create_user(&state, "Owner", "owner@example.com", Role::Admin).await?;
    let staff = create_user(&state, "Clerk", "clerk@example.com", Role::Staff).await?;

    let category = data(
        category_service::create_category(
            &state,
            &admin,
            CreateCategoryRequest {
                name: "Drinks".into(),
                is_active: None,
            },
        )
        .await?,
    );
    let tea = data(
        product_service::create_product(
            &state,
            &admin,
            CreateProductRequest {
                name: "Iced Tea".into(),
                description: None,
                category_id: category.id,
                is_active: None,
                variants: vec![CreateVariantRequest {
                    name: "Regular".into(),
                    unit: Some("cup".into()),
                    cost_price: dec("20"),
                    selling_price: dec("50"),
                    stock_quantity: Some(dec("10")),
                    is_active: None,
                }],
            },
        )
        .await?,
    );
    let variant_id = tea.variants[0].id;

    let too_many = order_service::create_order(&state, &staff, order_for(variant_id, "20", None)).await;
    assert!(matches!(too_many, Err(AppError::Validation(_))));
    assert_eq!(variant_stock(&state, tea.id).await?, dec("10"));

    for quantity in ["1.0005", "0.0004"] {
        let fractional =
            order_service::create_order(&state, &staff, order_for(variant_id, quantity, None)).await;
        assert!(matches!(fractional, Err(AppError::Validation(_))), "{quantity}");
    }
    let mut blank = order_for(variant_id, "1", None);
    blank.customer_name = "   ".into();
    let blank = order_service::create_order(&state, &staff, blank).await;
    assert!(matches!(blank, Err(AppError::Validation(_))));
    assert_eq!(variant_stock(&state, tea.id).await?, dec("10"));

    let too_generous =
        order_service::create_order(&state, &staff, order_for(variant_id, "1", Some("60"))).await;
    assert!(matches!(too_generous, Err(AppError::Validation(_))));

    let order = data(
        order_service::create_order(&state, &staff, order_for(variant_id, "3", Some("10"))).await?,
    );
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, dec("140"));
    assert_eq!(order.total_cost, dec("60"));
    assert_eq!(order.total_profit, dec("80"));
    assert_eq!(order.items[0].subtotal, dec("150"));
    assert_eq!(variant_stock(&state, tea.id).await?, dec("7"));

    let upcoming = data(order_service::upcoming_orders(&state, UpcomingQuery::default()).await?);
    assert_eq!(upcoming.count, 1);
    let too_far = order_service::upcoming_orders(&state, UpcomingQuery { hours: Some(100) }).await;
    assert!(matches!(too_far, Err(AppError::Validation(_))));

    let referenced = product_service::delete_variant(&state, &admin, tea.id, variant_id).await;
    assert!(matches!(referenced, Err(AppError::Validation(_))));

    let cancelled = data(
        order_service::update_order(
            &state,
            &staff,
            order.id,
            UpdateOrderRequest {
                status: Some(OrderStatus::Cancelled),
                ..Default::default()
            },
        )
        .await?,
    );
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(variant_stock(&state, tea.id).await?, dec("10"));

    let closed = order_service::update_order(
        &state,
        &staff,
        order.id,
        UpdateOrderRequest {
            note: Some(Some("late edit".into())),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(closed, Err(AppError::Validation(_))));

    let done = data(
        order_service::update_order(
            &state,
            &admin,
            order.id,
            UpdateOrderRequest {
                status: Some(OrderStatus::Done),
                ..Default::default()
            },
        )
        .await?,
    );
    assert_eq!(done.status, OrderStatus::Done);
    assert_eq!(variant_stock(&state, tea.id).await?, dec("7"));

    let not_pending = order_service::delete_order(&state, &admin, order.id).await;
    assert!(matches!(not_pending, Err(AppError::Validation(_))));

    let draft = data(order_service::create_order(&state, &staff, order_for(variant_id, "2", None)).await?);
    assert_eq!(variant_stock(&state, tea.id).await?, dec("5"));
    let staff_delete = order_service::delete_order(&state, &staff, draft.id).await;
    assert!(matches!(staff_delete, Err(AppError::Forbidden(_))));
    order_service::delete_order(&state, &admin, draft.id).await?;
    assert_eq!(variant_stock(&state, tea.id).await?, dec("7"));

    let done_only = order_service::list_orders(
        &state,
        OrderListQuery {
            status: Some(OrderStatus::Done),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(done_only.meta.as_ref().and_then(|m| m.total), Some(1));

    let revenue = data(report_service::revenue(&state, &admin, today()).await?);
    assert_eq!(revenue.total_orders, 1);
    assert_eq!(revenue.total_revenue, dec("140"));

    let stats = data(report_service::orders_stats(&state, &admin, today()).await?);
    assert_eq!(stats.counts.total_orders, 1);
    assert_eq!(stats.counts.done_orders, 1);

    let day = Utc::now().date_naive().to_string();
    let top = data(
        report_service::top_products(
            &state,
            &admin,
            TopProductsQuery {
                from: Some(day.clone()),
                to: Some(day),
                limit: Some(5),
            },
        )
        .await?,
    );
    assert_eq!(top.products.len(), 1);
    assert_eq!(top.products[0].variant_id, variant_id);
    assert_eq!(top.products[0].total_quantity, dec("3"));

    let daily = data(report_service::daily_revenue(&state, &admin, today()).await?);
    assert_eq!(daily.data.len(), 1);
    assert_eq!(daily.data[0].revenue, dec("140"));

    let staff_report = report_service::profit(&state, &staff, today()).await;
    assert!(matches!(staff_report, Err(AppError::Forbidden(_))));

    let workbook = export_service::export_orders(&state, &admin, today()).await?;
    assert!(workbook.filename.starts_with("orders_"));
    assert!(workbook.bytes.starts_with(b"PK"));

    Ok(())
}
