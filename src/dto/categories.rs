use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{dto::not_blank, models::Category, routes::params::Pagination};

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryListQuery {
    pub page: Option<i64>,
    #[serde(alias = "limit")]
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

impl CategoryListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateCategoryRequest {
    #[validate(
        length(min = 1, max = 100, message = "Category name must be 1-100 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(
        length(min = 1, max = 100, message = "Category name must be 1-100 characters"),
        custom(function = "not_blank")
    )]
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}
