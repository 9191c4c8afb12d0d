use std::borrow::Cow;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use validator::ValidationError;

pub mod auth;
pub mod categories;
pub mod customers;
pub mod ingredients;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod reports;
pub mod users;

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Exclusive bound for quantities stored as NUMERIC(14, 3).
pub fn quantity_limit() -> Decimal {
    Decimal::from(100_000_000_000i64)
}

/// Exclusive bound for prices stored as NUMERIC(14, 2).
pub fn money_limit() -> Decimal {
    Decimal::from(1_000_000_000_000i64)
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn fits_column(value: &Decimal, max_scale: u32, limit: Decimal) -> Result<(), ValidationError> {
    if value.normalize().scale() > max_scale {
        return Err(invalid("scale", match max_scale {
            2 => "Amount allows at most 2 decimal places",
            _ => "Quantity allows at most 3 decimal places",
        }));
    }
    if value.abs() >= limit {
        return Err(invalid("range", "Value is too large"));
    }
    Ok(())
}

/// Money amount: not negative, at most cents.
pub fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(invalid("non_negative", "Value must not be negative"));
    }
    fits_column(value, 2, money_limit())
}

/// Quantity moved by an order line or an import.
pub fn positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(invalid("positive", "Quantity must be greater than 0"));
    }
    fits_column(value, 3, quantity_limit())
}

/// Stock level set directly on a variant.
pub fn stock_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(invalid("non_negative", "Stock must not be negative"));
    }
    fits_column(value, 3, quantity_limit())
}

/// Rejects text that is empty once surrounding whitespace is trimmed.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "must not be blank"));
    }
    Ok(())
}

/// Length check for nullable text fields carried as `Option<Option<String>>`.
pub fn check_len(
    value: &Option<Option<String>>,
    max: usize,
    field: &str,
) -> Result<(), crate::error::AppError> {
    if let Some(Some(text)) = value {
        if text.chars().count() > max {
            return Err(crate::error::AppError::validation(format!(
                "{field} is too long"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        note: Option<Option<String>>,
    }

    #[test]
    fn double_option_tells_null_from_missing() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"note":null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"note":"x"}"#).unwrap();
        assert_eq!(missing.note, None);
        assert_eq!(null.note, Some(None));
        assert_eq!(set.note, Some(Some("x".to_string())));
    }

    #[test]
    fn decimal_checks() {
        assert!(non_negative(&Decimal::ZERO).is_ok());
        assert!(non_negative(&Decimal::new(-1, 2)).is_err());
        assert!(positive(&Decimal::ZERO).is_err());
        assert!(positive(&Decimal::new(1, 3)).is_ok());
    }

    fn dec(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    #[test]
    fn decimals_must_fit_their_columns() {
        assert!(positive(&dec("1.0005")).is_err());
        assert!(positive(&dec("0.0004")).is_err());
        assert!(positive(&dec("1.500")).is_ok());
        assert!(positive(&dec("1.5000")).is_ok());
        assert!(positive(&dec("99999999999.999")).is_ok());
        assert!(positive(&dec("100000000000")).is_err());
        assert!(positive(&Decimal::MAX).is_err());

        assert!(non_negative(&dec("35000.50")).is_ok());
        assert!(non_negative(&dec("0.001")).is_err());
        assert!(non_negative(&dec("1000000000000")).is_err());

        assert!(stock_amount(&Decimal::ZERO).is_ok());
        assert!(stock_amount(&dec("12.125")).is_ok());
        assert!(stock_amount(&dec("12.1255")).is_err());
        assert!(stock_amount(&dec("-1")).is_err());
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(not_blank("Latte").is_ok());
        assert!(not_blank("  Latte ").is_ok());
        assert!(not_blank("").is_err());
        assert!(not_blank("   ").is_err());
        assert!(not_blank("\t\n").is_err());
    }
}
