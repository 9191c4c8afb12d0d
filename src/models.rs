use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    categories, customers, ingredients, orders::OrderStatus, product_variants, users,
    users::Role,
};

pub(crate) fn utc(dt: DateTime<FixedOffset>) -> DateTime<Utc> {
    dt.with_timezone(&Utc)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            is_active: model.is_active,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
}

impl From<&users::Model> for UserSummary {
    fn from(model: &users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn from_entity(model: categories::Model, product_count: i64) -> Self {
        Self {
            id: model.id,
            name: model.name,
            is_active: model.is_active,
            product_count,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub unit: String,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    pub stock_quantity: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<product_variants::Model> for ProductVariant {
    fn from(model: product_variants::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            name: model.name,
            unit: model.unit,
            cost_price: model.cost_price,
            selling_price: model.selling_price,
            stock_quantity: model.stock_quantity,
            is_active: model.is_active,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub category_id: Uuid,
    pub category: Option<CategorySummary>,
    pub variants: Vec<ProductVariant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub stock_quantity: Decimal,
    pub is_active: bool,
    pub import_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    pub fn from_entity(model: ingredients::Model, import_count: i64) -> Self {
        Self {
            id: model.id,
            name: model.name,
            unit: model.unit,
            stock_quantity: model.stock_quantity,
            is_active: model.is_active,
            import_count,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngredientSummary {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub stock_quantity: Decimal,
}

impl From<&ingredients::Model> for IngredientSummary {
    fn from(model: &ingredients::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            unit: model.unit.clone(),
            stock_quantity: model.stock_quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InventoryImport {
    pub id: Uuid,
    pub quantity: Decimal,
    pub import_price: Decimal,
    pub total_price: Decimal,
    pub import_date: DateTime<Utc>,
    pub note: Option<String>,
    pub ingredient: Option<IngredientSummary>,
    pub created_by: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub address: Option<String>,
    pub note: Option<String>,
    pub order_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn from_entity(model: customers::Model, order_count: i64) -> Self {
        Self {
            id: model.id,
            name: model.name,
            phone: model.phone,
            address: model.address,
            note: model.note,
            order_count,
            created_at: utc(model.created_at),
            updated_at: utc(model.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
}

impl From<&customers::Model> for CustomerSummary {
    fn from(model: &customers::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            phone: model.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VariantSummary {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub product_id: Uuid,
    pub product: Option<ProductSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_variant_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub cost_price: Decimal,
    pub subtotal: Decimal,
    pub product_variant: Option<VariantSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    pub delivery_time: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub discount: Decimal,
    pub note: Option<String>,
    pub customer_id: Option<Uuid>,
    pub customer: Option<CustomerSummary>,
    pub created_by: Option<UserSummary>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
