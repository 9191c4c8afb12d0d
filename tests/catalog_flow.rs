mod common;

use rust_decimal::Decimal;
use shop_backoffice::{
    dto::{
        categories::{CategoryListQuery, CreateCategoryRequest},
        customers::{CreateCustomerRequest, CustomerListQuery, UpdateCustomerRequest},
        products::{
            CreateProductRequest, CreateVariantRequest, ProductListQuery, UpdateProductRequest,
            UpsertVariantRequest,
        },
    },
    entity::users::Role,
    error::AppError,
    services::{category_service, customer_service, export_service, product_service},
};

use common::{create_user, data, setup_state};

fn dec(raw: &str) -> Decimal {
    raw.parse().expect("decimal")
}

fn new_variant(name: &str, price: &str) -> CreateVariantRequest {
    CreateVariantRequest {
        name: name.into(),
        unit: None,
        cost_price: dec("10"),
        selling_price: dec(price),
        stock_quantity: Some(dec("5")),
        is_active: None,
    }
}

// Categories, products with variants, and customers through their services.
#[tokio::test]
async fn catalog_and_customer_management() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = create_user(&state, "Owner", "owner@example.com", Role::Admin).await?;
    let staff = create_user(&state, "Clerk", "clerk@example.com", Role::Staff).await?;

    let cakes = data(
        category_service::create_category(
            &state,
            &admin,
            CreateCategoryRequest {
                name: "Cakes".into(),
                is_active: None,
            },
        )
        .await?,
    );
    let duplicate = category_service::create_category(
        &state,
        &admin,
        CreateCategoryRequest {
            name: "  CAKES ".into(),
            is_active: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Validation(_))));
    let blank = category_service::create_category(
        &state,
        &admin,
        CreateCategoryRequest {
            name: "   ".into(),
            is_active: None,
        },
    )
    .await;
    assert!(matches!(blank, Err(AppError::Validation(_))));

    let no_variants = product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            name: "Empty".into(),
            description: None,
            category_id: cakes.id,
            is_active: None,
            variants: Vec::new(),
        },
    )
    .await;
    assert!(matches!(no_variants, Err(AppError::Validation(_))));

    let sponge = data(
        product_service::create_product(
            &state,
            &admin,
            CreateProductRequest {
                name: "Sponge Cake".into(),
                description: Some("Vanilla".into()),
                category_id: cakes.id,
                is_active: None,
                variants: vec![new_variant("Small", "20"), new_variant("Large", "35")],
            },
        )
        .await?,
    );
    assert_eq!(sponge.variants.len(), 2);
    assert!(sponge.variants.iter().all(|v| v.unit == "portion"));
    assert_eq!(sponge.category.as_ref().map(|c| c.name.as_str()), Some("Cakes"));

    let small = sponge
        .variants
        .iter()
        .find(|v| v.name == "Small")
        .expect("small variant");
    let updated = data(
        product_service::update_product(
            &state,
            &admin,
            sponge.id,
            UpdateProductRequest {
                description: Some(None),
                variants: Some(vec![
                    UpsertVariantRequest {
                        id: Some(small.id),
                        name: "Small".into(),
                        unit: Some("slice".into()),
                        cost_price: dec("10"),
                        selling_price: dec("22"),
                        stock_quantity: None,
                        is_active: None,
                    },
                    UpsertVariantRequest {
                        id: None,
                        name: "Medium".into(),
                        unit: None,
                        cost_price: dec("12"),
                        selling_price: dec("28"),
                        stock_quantity: Some(dec("3")),
                        is_active: None,
                    },
                ]),
                ..Default::default()
            },
        )
        .await?,
    );
    assert_eq!(updated.description, None);
    let mut names: Vec<&str> = updated.variants.iter().map(|v| v.name.as_str()).collect();
    names.sort();
    assert_eq!(names, ["Medium", "Small"]);
    let kept = updated
        .variants
        .iter()
        .find(|v| v.id == small.id)
        .expect("kept variant");
    assert_eq!(kept.selling_price, dec("22"));
    assert_eq!(kept.stock_quantity, dec("5"));

    let twice = |price: &str| UpsertVariantRequest {
        id: Some(small.id),
        name: "Small".into(),
        unit: None,
        cost_price: dec("10"),
        selling_price: dec(price),
        stock_quantity: None,
        is_active: None,
    };
    let repeated = product_service::update_product(
        &state,
        &admin,
        sponge.id,
        UpdateProductRequest {
            variants: Some(vec![twice("23"), twice("24")]),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(repeated, Err(AppError::Validation(_))));
    let unchanged = data(product_service::get_product(&state, sponge.id).await?);
    assert_eq!(unchanged.variants.len(), 2);
    let small_now = unchanged
        .variants
        .iter()
        .find(|v| v.id == small.id)
        .expect("small variant");
    assert_eq!(small_now.selling_price, dec("22"));

    let listed = product_service::list_products(
        &state,
        ProductListQuery {
            category_id: Some(cakes.id),
            search: Some("sponge".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(listed.meta.as_ref().and_then(|m| m.total), Some(1));

    let categories = data(
        category_service::list_categories(&state, CategoryListQuery::default()).await?,
    );
    assert_eq!(categories.items[0].product_count, 1);

    let in_use = category_service::delete_category(&state, &admin, cakes.id).await;
    assert!(matches!(in_use, Err(AppError::Validation(_))));

    let staff_delete = product_service::delete_product(&state, &staff, sponge.id).await;
    assert!(matches!(staff_delete, Err(AppError::Forbidden(_))));
    product_service::delete_product(&state, &admin, sponge.id).await?;
    let inactive = data(product_service::get_product(&state, sponge.id).await?);
    assert!(!inactive.is_active);

    let export = export_service::export_products(&state, &admin).await?;
    assert!(export.filename.starts_with("products"));
    assert!(export.bytes.starts_with(b"PK"));

    let alice = data(
        customer_service::create_customer(
            &state,
            &staff,
            CreateCustomerRequest {
                name: "Alice".into(),
                phone: "0900000001".into(),
                address: Some("1 Main St".into()),
                note: None,
            },
        )
        .await?,
    );
    let same_phone = customer_service::create_customer(
        &state,
        &staff,
        CreateCustomerRequest {
            name: "Alice Again".into(),
            phone: "0900000001".into(),
            address: None,
            note: None,
        },
    )
    .await;
    assert!(matches!(same_phone, Err(AppError::Validation(_))));

    let alice = data(
        customer_service::update_customer(
            &state,
            &staff,
            alice.id,
            UpdateCustomerRequest {
                address: Some(None),
                ..Default::default()
            },
        )
        .await?,
    );
    assert_eq!(alice.address, None);

    let found = customer_service::list_customers(
        &state,
        CustomerListQuery {
            search: Some("0900".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(found.meta.as_ref().and_then(|m| m.total), Some(1));

    let staff_remove = customer_service::delete_customer(&state, &staff, alice.id).await;
    assert!(matches!(staff_remove, Err(AppError::Forbidden(_))));
    customer_service::delete_customer(&state, &admin, alice.id).await?;

    Ok(())
}
