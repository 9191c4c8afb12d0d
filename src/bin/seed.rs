use rust_decimal::Decimal;
use shop_backoffice::{
    config::AppConfig,
    db::{create_pool, orm_from_pool, run_migrations},
    services::auth_service::hash_password,
};
use sqlx::PgPool;
use uuid::Uuid;

struct SeedVariant {
    name: &'static str,
    unit: &'static str,
    cost: i64,
    price: i64,
    stock: i64,
}

const fn variant(name: &'static str, unit: &'static str, cost: i64, price: i64, stock: i64) -> SeedVariant {
    SeedVariant {
        name,
        unit,
        cost,
        price,
        stock,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, 2).await?;
    run_migrations(&orm_from_pool(&pool)).await?;

    let admin_id = ensure_user(&pool, "Shop Owner", "admin@example.com", "admin123", "ADMIN").await?;
    ensure_user(&pool, "Staff One", "staff1@example.com", "staff123", "STAFF").await?;
    ensure_user(&pool, "Staff Two", "staff2@example.com", "staff123", "STAFF").await?;

    seed_catalog(&pool).await?;
    seed_ingredients(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}");
    Ok(())
}

async fn ensure_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role, is_active = TRUE
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(id)
}

async fn ensure_category(pool: &PgPool, name: &str) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name)
        VALUES ($1, $2)
        ON CONFLICT ((LOWER(name))) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn seed_catalog(pool: &PgPool) -> anyhow::Result<()> {
    let catalog = [
        (
            "Cakes",
            "Sponge Cake",
            "Light vanilla sponge",
            vec![
                variant("Small", "cake", 60_000, 120_000, 10),
                variant("Large", "cake", 110_000, 220_000, 5),
            ],
        ),
        (
            "Cakes",
            "Cheesecake",
            "Baked cream cheese cake",
            vec![variant("Slice", "slice", 15_000, 35_000, 40)],
        ),
        (
            "Drinks",
            "Iced Tea",
            "Brewed daily",
            vec![
                variant("Regular", "cup", 5_000, 15_000, 100),
                variant("Large", "cup", 7_000, 20_000, 80),
            ],
        ),
        (
            "Snacks",
            "Spring Rolls",
            "Fried, served with dipping sauce",
            vec![variant("Box of 10", "box", 25_000, 60_000, 30)],
        ),
    ];

    for (category, name, description, variants) in catalog {
        let category_id = ensure_category(pool, category).await?;

        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM products WHERE name = $1 AND category_id = $2")
                .bind(name)
                .bind(category_id)
                .fetch_optional(pool)
                .await?;
        if existing.is_some() {
            continue;
        }

        let product_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO products (id, name, description, category_id) VALUES ($1, $2, $3, $4)",
        )
        .bind(product_id)
        .bind(name)
        .bind(description)
        .bind(category_id)
        .execute(pool)
        .await?;

        for v in variants {
            sqlx::query(
                r#"
                INSERT INTO product_variants
                    (id, product_id, name, unit, cost_price, selling_price, stock_quantity)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(v.name)
            .bind(v.unit)
            .bind(Decimal::from(v.cost))
            .bind(Decimal::from(v.price))
            .bind(Decimal::from(v.stock))
            .execute(pool)
            .await?;
        }
    }

    println!("Seeded catalog");
    Ok(())
}

async fn seed_ingredients(pool: &PgPool) -> anyhow::Result<()> {
    let ingredients = [
        ("Flour", "kg"),
        ("Sugar", "kg"),
        ("Eggs", "piece"),
        ("Cream Cheese", "kg"),
        ("Tea Leaves", "kg"),
    ];

    for (name, unit) in ingredients {
        sqlx::query(
            r#"
            INSERT INTO ingredients (id, name, unit)
            VALUES ($1, $2, $3)
            ON CONFLICT ((LOWER(name))) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(unit)
        .execute(pool)
        .await?;
    }

    println!("Seeded ingredients");
    Ok(())
}
