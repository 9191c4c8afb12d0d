use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::reports::{
        CostReport, DailyRevenue, DailyRevenueReport, OrderStatusCounts, OrdersStatsReport,
        ProfitReport, RevenueReport, TopProduct, TopProductsQuery, TopProductsReport,
    },
    entity::orders::OrderStatus,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    response::{ApiResponse, Meta},
    routes::params::DateRangeQuery,
    state::AppState,
};

fn revenue_statuses() -> Vec<String> {
    OrderStatus::REVENUE
        .iter()
        .map(|s| s.as_str().to_string())
        .collect()
}

pub(crate) fn average(total: Decimal, count: i64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    (total / Decimal::from(count)).round_dp(2)
}

pub(crate) fn tally(rows: &[(String, i64)]) -> OrderStatusCounts {
    let mut counts = OrderStatusCounts::default();
    for (status, count) in rows {
        counts.total_orders += count;
        match status.as_str() {
            s if s == OrderStatus::Pending.as_str() => counts.pending_orders += count,
            s if s == OrderStatus::Confirmed.as_str() => counts.confirmed_orders += count,
            s if s == OrderStatus::Done.as_str() => counts.done_orders += count,
            s if s == OrderStatus::Cancelled.as_str() => counts.cancelled_orders += count,
            _ => {}
        }
    }
    counts
}

/// Longest range a daily series may cover, one leap year.
pub(crate) const MAX_SERIES_DAYS: i64 = 366;

pub(crate) fn ensure_series_span(from: NaiveDate, to: NaiveDate) -> AppResult<()> {
    if (to - from).num_days() >= MAX_SERIES_DAYS {
        return Err(AppError::validation(format!(
            "Daily series cover at most {MAX_SERIES_DAYS} days"
        )));
    }
    Ok(())
}

/// One entry per calendar day in `[from, to]`, zero where no order landed.
pub(crate) fn fill_days(
    from: NaiveDate,
    to: NaiveDate,
    rows: Vec<(NaiveDate, Decimal, i64)>,
) -> Vec<DailyRevenue> {
    let by_day: HashMap<NaiveDate, (Decimal, i64)> = rows
        .into_iter()
        .map(|(day, revenue, orders)| (day, (revenue, orders)))
        .collect();

    from.iter_days()
        .take_while(|day| *day <= to)
        .take(MAX_SERIES_DAYS as usize)
        .map(|date| {
            let (revenue, orders) = by_day.get(&date).copied().unwrap_or((Decimal::ZERO, 0));
            DailyRevenue {
                date,
                revenue,
                orders,
            }
        })
        .collect()
}

pub(crate) async fn revenue_summary(
    pool: &DbPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> AppResult<RevenueReport> {
    let (total_revenue, total_orders): (Decimal, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(total_amount), 0), COUNT(*)
        FROM orders
        WHERE status = ANY($1) AND created_at BETWEEN $2 AND $3
        "#,
    )
    .bind(revenue_statuses())
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    Ok(RevenueReport {
        total_revenue,
        total_orders,
        average_order_value: average(total_revenue, total_orders),
        period_start: from,
        period_end: to,
    })
}

pub(crate) async fn daily_series(
    pool: &DbPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> AppResult<Vec<DailyRevenue>> {
    ensure_series_span(from.date_naive(), to.date_naive())?;
    let rows: Vec<(NaiveDate, Decimal, i64)> = sqlx::query_as(
        r#"
        SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
               COALESCE(SUM(total_amount), 0),
               COUNT(*)
        FROM orders
        WHERE status = ANY($1) AND created_at BETWEEN $2 AND $3
        GROUP BY day
        ORDER BY day
        "#,
    )
    .bind(revenue_statuses())
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(fill_days(from.date_naive(), to.date_naive(), rows))
}

pub async fn revenue(
    state: &AppState,
    user: &AuthUser,
    query: DateRangeQuery,
) -> AppResult<ApiResponse<RevenueReport>> {
    ensure_admin(user)?;
    let (from, to) = query.required()?;
    let report = revenue_summary(&state.pool, from, to).await?;
    Ok(ApiResponse::success("Revenue report", report, Some(Meta::empty())))
}

pub async fn costs(
    state: &AppState,
    user: &AuthUser,
    query: DateRangeQuery,
) -> AppResult<ApiResponse<CostReport>> {
    ensure_admin(user)?;
    let (from, to) = query.required()?;

    let (total_import_cost, total_imports): (Decimal, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(total_price), 0), COUNT(*)
        FROM inventory_imports
        WHERE import_date BETWEEN $1 AND $2
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Cost report",
        CostReport {
            total_import_cost,
            total_imports,
            period_start: from,
            period_end: to,
        },
        Some(Meta::empty()),
    ))
}

pub async fn profit(
    state: &AppState,
    user: &AuthUser,
    query: DateRangeQuery,
) -> AppResult<ApiResponse<ProfitReport>> {
    ensure_admin(user)?;
    let (from, to) = query.required()?;

    let (total_revenue, total_cost, gross_profit): (Decimal, Decimal, Decimal) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(total_amount), 0),
               COALESCE(SUM(total_cost), 0),
               COALESCE(SUM(total_profit), 0)
        FROM orders
        WHERE status = ANY($1) AND created_at BETWEEN $2 AND $3
        "#,
    )
    .bind(revenue_statuses())
    .bind(from)
    .bind(to)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Profit report",
        ProfitReport {
            total_revenue,
            total_cost,
            gross_profit,
            period_start: from,
            period_end: to,
        },
        Some(Meta::empty()),
    ))
}

pub async fn orders_stats(
    state: &AppState,
    user: &AuthUser,
    query: DateRangeQuery,
) -> AppResult<ApiResponse<OrdersStatsReport>> {
    ensure_admin(user)?;
    let (from, to) = query.required()?;

    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT status, COUNT(*)
        FROM orders
        WHERE created_at BETWEEN $1 AND $2
        GROUP BY status
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Order statistics",
        OrdersStatsReport {
            counts: tally(&rows),
            period_start: from,
            period_end: to,
        },
        Some(Meta::empty()),
    ))
}

#[derive(Debug, sqlx::FromRow)]
struct TopProductRow {
    product_id: Uuid,
    product_name: String,
    variant_id: Uuid,
    variant_name: String,
    variant_unit: String,
    total_quantity: Decimal,
    total_revenue: Decimal,
}

pub async fn top_products(
    state: &AppState,
    user: &AuthUser,
    query: TopProductsQuery,
) -> AppResult<ApiResponse<TopProductsReport>> {
    ensure_admin(user)?;
    let (from, to) = query.range()?;

    let rows: Vec<TopProductRow> = sqlx::query_as(
        r#"
        SELECT p.id AS product_id,
               p.name AS product_name,
               v.id AS variant_id,
               v.name AS variant_name,
               v.unit AS variant_unit,
               SUM(oi.quantity) AS total_quantity,
               SUM(oi.subtotal) AS total_revenue
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        JOIN product_variants v ON v.id = oi.product_variant_id
        JOIN products p ON p.id = v.product_id
        WHERE o.status = ANY($1) AND o.created_at BETWEEN $2 AND $3
        GROUP BY p.id, p.name, v.id, v.name, v.unit
        ORDER BY total_quantity DESC, total_revenue DESC
        LIMIT $4
        "#,
    )
    .bind(revenue_statuses())
    .bind(from)
    .bind(to)
    .bind(query.limit())
    .fetch_all(&state.pool)
    .await?;

    let products = rows
        .into_iter()
        .map(|r| TopProduct {
            product_id: r.product_id,
            product_name: r.product_name,
            variant_id: r.variant_id,
            variant_name: r.variant_name,
            variant_unit: r.variant_unit,
            total_quantity: r.total_quantity,
            total_revenue: r.total_revenue,
        })
        .collect();

    Ok(ApiResponse::success(
        "Top products",
        TopProductsReport {
            products,
            period_start: from,
            period_end: to,
        },
        Some(Meta::empty()),
    ))
}

pub async fn daily_revenue(
    state: &AppState,
    user: &AuthUser,
    query: DateRangeQuery,
) -> AppResult<ApiResponse<DailyRevenueReport>> {
    ensure_admin(user)?;
    let (from, to) = query.required()?;
    let data = daily_series(&state.pool, from, to).await?;

    Ok(ApiResponse::success(
        "Daily revenue",
        DailyRevenueReport {
            data,
            period_start: from,
            period_end: to,
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn missing_days_are_zero_filled() {
        let rows = vec![(day("2024-03-02"), Decimal::new(150_000, 0), 3)];
        let series = fill_days(day("2024-03-01"), day("2024-03-03"), rows);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].orders, 0);
        assert_eq!(series[0].revenue, Decimal::ZERO);
        assert_eq!(series[1].date, day("2024-03-02"));
        assert_eq!(series[1].orders, 3);
        assert_eq!(series[2].date, day("2024-03-03"));
    }

    #[test]
    fn series_span_is_capped_at_a_leap_year() {
        assert!(ensure_series_span(day("2024-01-01"), day("2024-12-31")).is_ok());
        assert!(ensure_series_span(day("2024-01-01"), day("2025-01-01")).is_err());
        assert!(ensure_series_span(day("0001-01-01"), day("9999-12-31")).is_err());
        let series = fill_days(day("2024-01-01"), day("2024-12-31"), Vec::new());
        assert_eq!(series.len(), 366);
    }

    #[test]
    fn single_day_range_has_one_entry() {
        let series = fill_days(day("2024-03-01"), day("2024-03-01"), Vec::new());
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn status_tally_counts_every_status() {
        let rows = vec![
            ("PENDING".to_string(), 2),
            ("DONE".to_string(), 5),
            ("CANCELLED".to_string(), 1),
        ];
        let counts = tally(&rows);
        assert_eq!(counts.total_orders, 8);
        assert_eq!(counts.pending_orders, 2);
        assert_eq!(counts.confirmed_orders, 0);
        assert_eq!(counts.done_orders, 5);
        assert_eq!(counts.cancelled_orders, 1);
    }

    #[test]
    fn average_handles_empty_periods() {
        assert_eq!(average(Decimal::ZERO, 0), Decimal::ZERO);
        assert_eq!(average(Decimal::new(100, 0), 3), Decimal::new(3333, 2));
    }
}
