use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{double_option, non_negative, not_blank, stock_amount},
    models::Product,
    routes::params::Pagination,
};

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    pub page: Option<i64>,
    #[serde(alias = "limit")]
    pub per_page: Option<i64>,
    /// Matches name or description
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

impl ProductListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateVariantRequest {
    #[validate(
        length(min = 1, max = 100, message = "Variant name must be 1-100 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
    #[validate(
        length(min = 1, max = 50, message = "Unit must be 1-50 characters"),
        custom(function = "not_blank")
    )]
    pub unit: Option<String>,
    #[validate(custom(function = "non_negative"))]
    pub cost_price: Decimal,
    #[validate(custom(function = "non_negative"))]
    pub selling_price: Decimal,
    #[validate(custom(function = "stock_amount"))]
    pub stock_quantity: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateProductRequest {
    #[validate(
        length(min = 1, max = 200, message = "Product name must be 1-200 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
    pub category_id: Uuid,
    pub is_active: Option<bool>,
    #[validate(length(min = 1, message = "At least one variant is required"), nested)]
    pub variants: Vec<CreateVariantRequest>,
}

/// Entry of the full variant list sent with a product update.
/// With an `id` the variant is updated, without one it is created.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpsertVariantRequest {
    pub id: Option<Uuid>,
    #[validate(
        length(min = 1, max = 100, message = "Variant name must be 1-100 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
    #[validate(
        length(min = 1, max = 50, message = "Unit must be 1-50 characters"),
        custom(function = "not_blank")
    )]
    pub unit: Option<String>,
    #[validate(custom(function = "non_negative"))]
    pub cost_price: Decimal,
    #[validate(custom(function = "non_negative"))]
    pub selling_price: Decimal,
    #[validate(custom(function = "stock_amount"))]
    pub stock_quantity: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateProductRequest {
    #[validate(
        length(min = 1, max = 200, message = "Product name must be 1-200 characters"),
        custom(function = "not_blank")
    )]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub category_id: Option<Uuid>,
    pub is_active: Option<bool>,
    #[validate(length(min = 1, message = "At least one variant is required"), nested)]
    pub variants: Option<Vec<UpsertVariantRequest>>,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateVariantRequest {
    #[validate(
        length(min = 1, max = 100, message = "Variant name must be 1-100 characters"),
        custom(function = "not_blank")
    )]
    pub name: Option<String>,
    #[validate(
        length(min = 1, max = 50, message = "Unit must be 1-50 characters"),
        custom(function = "not_blank")
    )]
    pub unit: Option<String>,
    #[validate(custom(function = "non_negative"))]
    pub cost_price: Option<Decimal>,
    #[validate(custom(function = "non_negative"))]
    pub selling_price: Option<Decimal>,
    #[validate(custom(function = "stock_amount"))]
    pub stock_quantity: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(name: &str, stock: &str) -> UpsertVariantRequest {
        UpsertVariantRequest {
            id: None,
            name: name.into(),
            unit: None,
            cost_price: Decimal::new(20000, 0),
            selling_price: Decimal::new(35000, 0),
            stock_quantity: Some(stock.parse().unwrap()),
            is_active: None,
        }
    }

    #[test]
    fn variant_lists_are_validated_with_their_entries() {
        let create = CreateProductRequest {
            name: "Latte".into(),
            description: None,
            category_id: Uuid::nil(),
            is_active: None,
            variants: vec![],
        };
        let err = create.validate().unwrap_err();
        assert!(err.field_errors().contains_key("variants"));

        let update = UpdateProductRequest {
            variants: Some(vec![variant("Large", "3")]),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
        let update = UpdateProductRequest {
            variants: Some(vec![]),
            ..Default::default()
        };
        assert!(update.validate().is_err());
        let update = UpdateProductRequest {
            variants: Some(vec![variant("  ", "3")]),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn stock_keeps_three_decimals_and_prices_two() {
        assert!(variant("Large", "2.125").validate().is_ok());
        assert!(variant("Large", "2.1255").validate().is_err());
        let mut priced = variant("Large", "1");
        priced.selling_price = "35000.005".parse().unwrap();
        assert!(priced.validate().is_err());
    }
}
