use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{error::AppResult, routes::params::DateRangeQuery};

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TopProductsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    /// Number of variants to return (default 10)
    pub limit: Option<i64>,
}

impl TopProductsQuery {
    pub fn range(&self) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
        DateRangeQuery {
            from: self.from.clone(),
            to: self.to.clone(),
        }
        .required()
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).max(1)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RevenueReport {
    pub total_revenue: Decimal,
    pub total_orders: i64,
    pub average_order_value: Decimal,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CostReport {
    pub total_import_cost: Decimal,
    pub total_imports: i64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfitReport {
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub gross_profit: Decimal,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrderStatusCounts {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub confirmed_orders: i64,
    pub done_orders: i64,
    pub cancelled_orders: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrdersStatsReport {
    #[serde(flatten)]
    pub counts: OrderStatusCounts,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub product_name: String,
    pub variant_id: Uuid,
    pub variant_name: String,
    pub variant_unit: String,
    pub total_quantity: Decimal,
    pub total_revenue: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopProductsReport {
    pub products: Vec<TopProduct>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: Decimal,
    pub orders: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DailyRevenueReport {
    pub data: Vec<DailyRevenue>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}
