use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{double_option, non_negative, positive},
    models::InventoryImport,
    routes::params::{Pagination, parse_range},
    error::AppResult,
};

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ImportListQuery {
    pub page: Option<i64>,
    #[serde(alias = "limit")]
    pub per_page: Option<i64>,
    pub ingredient_id: Option<Uuid>,
    /// Lower bound on import_date (RFC 3339 or YYYY-MM-DD)
    pub from: Option<String>,
    /// Upper bound on import_date (RFC 3339 or YYYY-MM-DD)
    pub to: Option<String>,
}

impl ImportListQuery {
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

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateImportRequest {
    pub ingredient_id: Uuid,
    #[validate(custom(function = "positive"))]
    pub quantity: Decimal,
    #[validate(custom(function = "non_negative"))]
    pub import_price: Decimal,
    pub import_date: Option<DateTime<Utc>>,
    #[validate(length(max = 500, message = "Note must be at most 500 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateImportRequest {
    #[validate(custom(function = "positive"))]
    pub quantity: Option<Decimal>,
    #[validate(custom(function = "non_negative"))]
    pub import_price: Option<Decimal>,
    pub import_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub note: Option<Option<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ImportList {
    #[schema(value_type = Vec<InventoryImport>)]
    pub items: Vec<InventoryImport>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportStats {
    pub total_imports: i64,
    pub total_cost: Decimal,
}
