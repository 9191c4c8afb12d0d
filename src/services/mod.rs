pub mod auth_service;
pub mod category_service;
pub mod customer_service;
pub mod export_service;
pub mod ingredient_service;
pub mod inventory_service;
pub mod order_service;
pub mod product_service;
pub mod report_service;
pub mod user_service;

use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult, QueryFilter, QuerySelect,
    sea_query::{Expr, Func, SimpleExpr, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::error::AppResult;

/// `%term%` for case-insensitive contains matching, or `None` for a blank search.
pub(crate) fn search_pattern(search: Option<&str>) -> Option<String> {
    let term = search.map(str::trim).filter(|s| !s.is_empty())?;
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

/// OR of `ILIKE pattern` over the given columns.
pub(crate) fn ilike_any<C: ColumnTrait>(columns: &[C], pattern: &str) -> Condition {
    columns.iter().fold(Condition::any(), |cond, col| {
        cond.add(Expr::col(*col).ilike(pattern))
    })
}

/// Case-insensitive equality, used for name uniqueness checks.
pub(crate) fn lower_eq<C: ColumnTrait>(column: C, value: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).eq(value.trim().to_lowercase())
}

#[derive(Debug, FromQueryResult)]
struct KeyCount {
    key: Uuid,
    count: i64,
}

/// Child row counts grouped by a foreign key column, for the given parent ids.
pub(crate) async fn count_by<E, C>(
    conn: &impl ConnectionTrait,
    column: C,
    ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, i64>>
where
    E: EntityTrait,
    C: ColumnTrait,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = E::find()
        .select_only()
        .column_as(column, "key")
        .column_as(Expr::col(column).count(), "count")
        .filter(column.is_in(ids))
        .group_by(column)
        .into_model::<KeyCount>()
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(|row| (row.key, row.count)).collect())
}

#[cfg(test)]
mod tests {
    use super::search_pattern;

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(search_pattern(None), None);
        assert_eq!(search_pattern(Some("   ")), None);
    }

    #[test]
    fn wildcards_are_escaped() {
        assert_eq!(search_pattern(Some(" pho ")).as_deref(), Some("%pho%"));
        assert_eq!(search_pattern(Some("50%")).as_deref(), Some("%50\\%%"));
        assert_eq!(search_pattern(Some("a_b")).as_deref(), Some("%a\\_b%"));
    }
}
