use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{double_option, non_negative, not_blank, positive},
    entity::orders::OrderStatus,
    error::AppResult,
    models::Order,
    routes::params::{Pagination, SortOrder, parse_range},
};

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderSortBy {
    #[default]
    CreatedAt,
    DeliveryTime,
    TotalAmount,
    CustomerName,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    #[serde(alias = "limit")]
    pub per_page: Option<i64>,
    /// Matches customer name, phone or address
    pub search: Option<String>,
    pub status: Option<OrderStatus>,
    /// Lower bound on created_at (RFC 3339 or YYYY-MM-DD)
    pub from: Option<String>,
    /// Upper bound on created_at (RFC 3339 or YYYY-MM-DD)
    pub to: Option<String>,
    pub sort_by: Option<OrderSortBy>,
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn range(&self) -> AppResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        parse_range(self.from.as_deref(), self.to.as_deref())
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UpcomingQuery {
    /// Look-ahead window in hours, 1-72 (default 2)
    pub hours: Option<i64>,
}

impl UpcomingQuery {
    pub fn hours(&self) -> AppResult<i64> {
        let hours = self.hours.unwrap_or(2);
        if !(1..=72).contains(&hours) {
            return Err(crate::error::AppError::validation(
                "Hours must be between 1 and 72",
            ));
        }
        Ok(hours)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct OrderItemRequest {
    pub product_variant_id: Uuid,
    #[validate(custom(function = "positive"))]
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateOrderRequest {
    #[validate(
        length(min = 1, max = 100, message = "Customer name must be 1-100 characters"),
        custom(function = "not_blank")
    )]
    pub customer_name: String,
    #[validate(
        length(min = 1, max = 20, message = "Phone must be 1-20 characters"),
        custom(function = "not_blank")
    )]
    pub phone: String,
    #[validate(
        length(min = 1, max = 500, message = "Address must be 1-500 characters"),
        custom(function = "not_blank")
    )]
    pub address: String,
    pub delivery_time: DateTime<Utc>,
    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
    #[validate(custom(function = "non_negative"))]
    pub discount: Option<Decimal>,
    pub customer_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Order must have at least one item"), nested)]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateOrderRequest {
    #[validate(
        length(min = 1, max = 100, message = "Customer name must be 1-100 characters"),
        custom(function = "not_blank")
    )]
    pub customer_name: Option<String>,
    #[validate(
        length(min = 1, max = 20, message = "Phone must be 1-20 characters"),
        custom(function = "not_blank")
    )]
    pub phone: Option<String>,
    #[validate(
        length(min = 1, max = 500, message = "Address must be 1-500 characters"),
        custom(function = "not_blank")
    )]
    pub address: Option<String>,
    pub delivery_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub note: Option<Option<String>>,
    #[validate(custom(function = "non_negative"))]
    pub discount: Option<Decimal>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OrderList {
    #[schema(value_type = Vec<Order>)]
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpcomingOrders {
    pub count: i64,
    pub hours: i64,
    pub items: Vec<Order>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(customer_name: &str, quantity: &str) -> CreateOrderRequest {
        serde_json::from_value(serde_json::json!({
            "customer_name": customer_name,
            "phone": "0812",
            "address": "Jl. Merdeka 1",
            "delivery_time": "2024-03-01T10:00:00Z",
            "items": [{ "product_variant_id": Uuid::nil(), "quantity": quantity }],
        }))
        .unwrap()
    }

    #[test]
    fn whitespace_only_text_fails_validation() {
        assert!(order("Budi", "2").validate().is_ok());
        let err = order("   ", "2").validate().unwrap_err();
        assert!(err.field_errors().contains_key("customer_name"));

        let patch = UpdateOrderRequest {
            phone: Some(" \t ".into()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn item_quantity_is_limited_to_three_decimals() {
        assert!(order("Budi", "1.5").validate().is_ok());
        assert!(order("Budi", "1.0005").validate().is_err());
        assert!(order("Budi", "0.0004").validate().is_err());
    }

    #[test]
    fn empty_item_list_is_rejected() {
        let mut req = order("Budi", "1");
        req.items.clear();
        let err = req.validate().unwrap_err();
        assert!(err.field_errors().contains_key("items"));
    }
}
