mod common;

use rust_decimal::Decimal;
use shop_backoffice::{
    dto::{
        ingredients::CreateIngredientRequest,
        inventory::{CreateImportRequest, ImportListQuery, UpdateImportRequest},
    },
    entity::users::Role,
    error::AppError,
    routes::params::DateRangeQuery,
    services::{ingredient_service, inventory_service, report_service},
};

use common::{create_user, data, setup_state};

fn dec(raw: &str) -> Decimal {
    raw.parse().expect("decimal")
}

// Imports move ingredient stock in step with create, update and delete.
#[tokio::test]
async fn imports_keep_ingredient_stock_in_sync() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = create_user(&state, "Owner", "owner@example.com", Role::Admin).await?;
    let staff = create_user(&state, "Clerk", "clerk@example.com", Role::Staff).await?;

    let flour = data(
        ingredient_service::create_ingredient(
            &state,
            &admin,
            CreateIngredientRequest {
                name: "Flour".into(),
                unit: None,
                is_active: None,
            },
        )
        .await?,
    );
    assert_eq!(flour.unit, "kg");
    assert_eq!(flour.stock_quantity, Decimal::ZERO);

    let duplicate = ingredient_service::create_ingredient(
        &state,
        &admin,
        CreateIngredientRequest {
            name: "flour".into(),
            unit: None,
            is_active: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Validation(_))));

    let forbidden = inventory_service::create_import(
        &state,
        &staff,
        CreateImportRequest {
            ingredient_id: flour.id,
            quantity: dec("1"),
            import_price: dec("1"),
            import_date: None,
            note: None,
        },
    )
    .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

    let first = data(
        inventory_service::create_import(
            &state,
            &admin,
            CreateImportRequest {
                ingredient_id: flour.id,
                quantity: dec("10"),
                import_price: dec("2.5"),
                import_date: None,
                note: Some("Weekly delivery".into()),
            },
        )
        .await?,
    );
    assert_eq!(first.total_price, dec("25"));

    let second = data(
        inventory_service::create_import(
            &state,
            &admin,
            CreateImportRequest {
                ingredient_id: flour.id,
                quantity: dec("3"),
                import_price: dec("3"),
                import_date: None,
                note: None,
            },
        )
        .await?,
    );

    let stock = data(ingredient_service::get_ingredient(&state, flour.id).await?);
    assert_eq!(stock.stock_quantity, dec("13"));
    assert_eq!(stock.import_count, 2);

    let updated = data(
        inventory_service::update_import(
            &state,
            &admin,
            first.id,
            UpdateImportRequest {
                quantity: Some(dec("4")),
                note: Some(None),
                ..Default::default()
            },
        )
        .await?,
    );
    assert_eq!(updated.total_price, dec("10"));
    assert_eq!(updated.note, None);

    let stock = data(ingredient_service::get_ingredient(&state, flour.id).await?);
    assert_eq!(stock.stock_quantity, dec("7"));

    let out_of_range = [
        ("0.0004", "1"),
        ("1.0005", "1"),
        ("1", "0.001"),
        ("99999999999.999", "999999999999.99"),
    ];
    for (quantity, price) in out_of_range {
        let rejected = inventory_service::create_import(
            &state,
            &admin,
            CreateImportRequest {
                ingredient_id: flour.id,
                quantity: dec(quantity),
                import_price: dec(price),
                import_date: None,
                note: None,
            },
        )
        .await;
        assert!(matches!(rejected, Err(AppError::Validation(_))), "{quantity} x {price}");
    }
    let stock = data(ingredient_service::get_ingredient(&state, flour.id).await?);
    assert_eq!(stock.stock_quantity, dec("7"));
    assert_eq!(stock.import_count, 2);

    let listed = inventory_service::list_imports(
        &state,
        ImportListQuery {
            ingredient_id: Some(flour.id),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(listed.meta.as_ref().and_then(|m| m.total), Some(2));

    let stats = data(
        inventory_service::import_stats(&state, DateRangeQuery { from: None, to: None }).await?,
    );
    assert_eq!(stats.total_imports, 2);
    assert_eq!(stats.total_cost, dec("19"));

    let today = chrono::Utc::now().date_naive().to_string();
    let costs = data(
        report_service::costs(
            &state,
            &admin,
            DateRangeQuery {
                from: Some(today.clone()),
                to: Some(today),
            },
        )
        .await?,
    );
    assert_eq!(costs.total_import_cost, dec("19"));

    let blocked = ingredient_service::delete_ingredient(&state, &admin, flour.id).await;
    assert!(matches!(blocked, Err(AppError::Validation(_))));

    inventory_service::delete_import(&state, &admin, first.id).await?;
    inventory_service::delete_import(&state, &admin, second.id).await?;
    let stock = data(ingredient_service::get_ingredient(&state, flour.id).await?);
    assert_eq!(stock.stock_quantity, Decimal::ZERO);

    ingredient_service::delete_ingredient(&state, &admin, flour.id).await?;
    let gone = ingredient_service::get_ingredient(&state, flour.id).await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));

    Ok(())
}
