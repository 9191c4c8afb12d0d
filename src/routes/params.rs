use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    pub page: Option<i64>,
    #[serde(alias = "limit")]
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let per_page = self.per_page.unwrap_or(10).clamp(1, 100);
        let page = self.page.unwrap_or(1).clamp(1, i64::MAX / per_page);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Lower bound of a range: a bare date means the start of that day (UTC).
pub fn parse_from(raw: &str) -> AppResult<DateTime<Utc>> {
    parse_bound(raw, NaiveTime::MIN, "from")
}

/// Upper bound of a range: a bare date covers the whole day (UTC).
pub fn parse_to(raw: &str) -> AppResult<DateTime<Utc>> {
    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    parse_bound(raw, end_of_day, "to")
}

fn parse_bound(raw: &str, time: NaiveTime, field: &str) -> AppResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(time).and_utc())
        .map_err(|_| AppError::validation(format!("Invalid date for '{field}'")))
}

/// Parse an optional `from`/`to` pair, rejecting inverted ranges.
pub fn parse_range(
    from: Option<&str>,
    to: Option<&str>,
) -> AppResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    let from = from.filter(|s| !s.is_empty()).map(parse_from).transpose()?;
    let to = to.filter(|s| !s.is_empty()).map(parse_to).transpose()?;
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(AppError::validation("'from' must not be after 'to'"));
        }
    }
    Ok((from, to))
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateRangeQuery {
    /// RFC 3339 date-time or YYYY-MM-DD
    pub from: Option<String>,
    /// RFC 3339 date-time or YYYY-MM-DD (whole day)
    pub to: Option<String>,
}

impl DateRangeQuery {
    /// Both bounds are mandatory.
    pub fn required(&self) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
        match parse_range(self.from.as_deref(), self.to.as_deref())? {
            (Some(from), Some(to)) => Ok((from, to)),
            _ => Err(AppError::validation("'from' and 'to' are required")),
        }
    }

    pub fn optional(&self) -> AppResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        parse_range(self.from.as_deref(), self.to.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(Pagination::default().normalize(), (1, 10, 0));
        let p = Pagination {
            page: Some(3),
            per_page: Some(500),
        };
        assert_eq!(p.normalize(), (3, 100, 200));
        let p = Pagination {
            page: Some(0),
            per_page: Some(0),
        };
        assert_eq!(p.normalize(), (1, 1, 0));
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let p = Pagination {
            page: Some(i64::MAX),
            per_page: Some(100),
        };
        let (page, per_page, offset) = p.normalize();
        assert_eq!(per_page, 100);
        assert_eq!(page, i64::MAX / 100);
        assert!(offset >= 0);
        assert_eq!(offset, (page - 1) * per_page);
    }

    #[test]
    fn bare_dates_cover_whole_days() {
        let from = parse_from("2024-03-01").unwrap();
        let to = parse_to("2024-03-01").unwrap();
        assert_eq!(from.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(to.format("%H:%M:%S").to_string(), "23:59:59");
    }

    #[test]
    fn rfc3339_is_converted_to_utc() {
        let dt = parse_from("2024-03-01T07:00:00+07:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn inverted_and_garbage_ranges_are_rejected() {
        assert!(parse_range(Some("2024-03-02"), Some("2024-03-01")).is_err());
        assert!(parse_from("yesterday").is_err());
        let q = DateRangeQuery {
            from: Some("2024-03-01".into()),
            to: None,
        };
        assert!(q.required().is_err());
        assert!(q.optional().is_ok());
    }
}
